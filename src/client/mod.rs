//! HTTP client for the blog API.
//!
//! [`ApiClient`] routes every call through an [`Interceptor`] that attaches a
//! fresh access token, and keeps the session in a [`TokenStore`] persisted via a
//! [`KeyValueStorage`] backend.

mod error;
mod guard;
mod http;
mod interceptor;
mod storage;
mod store;

pub use error::ClientError;
pub use guard::{LOGIN_PATH, Navigation, guard, login_redirect};
pub use http::{HttpAuthApi, RefreshApi};
pub use interceptor::{Interceptor, PUBLIC_ROUTES, is_public_route};
pub use storage::{AUTH_STORE_KEY, FileStorage, KeyValueStorage, MemoryStorage, PersistedAuth};
pub use store::TokenStore;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;
use url::Url;

use crate::models::{
    NewPost, PostUpdate, PostView, SignupRequest, TokenPair, UserProfile, UserUpdate,
};

pub struct ApiClient<S> {
    interceptor: Interceptor<S, HttpAuthApi>,
}

impl<S: KeyValueStorage> ApiClient<S> {
    /// Client for the API at `base`, rehydrating the session from `storage`.
    pub fn new(base: Url, storage: S) -> Self {
        Self {
            interceptor: Interceptor::new(TokenStore::open(storage), HttpAuthApi::new(base)),
        }
    }

    pub fn store(&self) -> &TokenStore<S> {
        self.interceptor.store()
    }

    pub fn auth_api(&self) -> &HttpAuthApi {
        self.interceptor.api()
    }

    /// Route gate for a protected page.
    pub fn guard(&self, path: &str) -> Navigation {
        guard(self.store(), path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let pair = self.auth_api().login(email, password).await?;
        self.store().set_tokens(&pair)?;
        info!(email = %email, "Logged in");
        Ok(pair)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<UserProfile, ClientError> {
        self.auth_api().signup(request).await
    }

    pub fn logout(&self) {
        self.store().clear();
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ClientError> {
        let token = self.interceptor.authorize(path).await?;
        let api = self.auth_api();

        let mut request = api.http().request(method, api.endpoint(path)?);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ClientError::upstream)?;
        self.interceptor
            .after_response(response, token.as_deref())
            .await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let response = self.send(method, path, body).await?;
        http::decode_json(response).await
    }

    /// Profile of the signed-in user.
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        let user_id = self
            .store()
            .snapshot()
            .user_id
            .ok_or_else(ClientError::login_required)?;
        self.get_user(user_id).await
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError> {
        self.send_json(Method::GET, "/users", None::<&()>).await
    }

    pub async fn get_user(&self, id: i64) -> Result<UserProfile, ClientError> {
        self.send_json(Method::GET, &format!("/users/{id}"), None::<&()>)
            .await
    }

    pub async fn update_user(
        &self,
        id: i64,
        update: &UserUpdate,
    ) -> Result<UserProfile, ClientError> {
        self.send_json(Method::PUT, &format!("/users/{id}"), Some(update))
            .await
    }

    pub async fn list_posts(&self) -> Result<Vec<PostView>, ClientError> {
        self.send_json(Method::GET, "/posts", None::<&()>).await
    }

    pub async fn get_post(&self, id: i64) -> Result<PostView, ClientError> {
        self.send_json(Method::GET, &format!("/posts/{id}"), None::<&()>)
            .await
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<PostView, ClientError> {
        self.send_json(Method::POST, "/posts", Some(post)).await
    }

    pub async fn update_post(&self, id: i64, update: &PostUpdate) -> Result<PostView, ClientError> {
        self.send_json(Method::PUT, &format!("/posts/{id}"), Some(update))
            .await
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), ClientError> {
        self.send(Method::DELETE, &format!("/posts/{id}"), None::<&()>)
            .await
            .map(|_| ())
    }
}
