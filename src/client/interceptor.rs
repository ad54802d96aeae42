//! Per-request authorization.
//!
//! Public routes go out untouched. Everything else gets a bearer access token,
//! refreshed first if it expired. Once a request is abandoned there is no retry.

use reqwest::Response;

use super::error::ClientError;
use super::http::{RefreshApi, error_for_status};
use super::storage::KeyValueStorage;
use super::store::TokenStore;

/// Routes that never carry or trigger a refresh of credentials.
pub const PUBLIC_ROUTES: [&str; 3] = ["/signup", "/refresh-token", "/login"];

/// Whether `path` (query string ignored) is a public route.
pub fn is_public_route(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    PUBLIC_ROUTES.contains(&path)
}

pub struct Interceptor<S, A> {
    store: TokenStore<S>,
    api: A,
}

impl<S: KeyValueStorage, A: RefreshApi> Interceptor<S, A> {
    pub fn new(store: TokenStore<S>, api: A) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &TokenStore<S> {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Bearer token to attach to a request for `path`, if any.
    pub async fn authorize(&self, path: &str) -> Result<Option<String>, ClientError> {
        if is_public_route(path) {
            return Ok(None);
        }
        self.store.ensure_access_token(&self.api).await.map(Some)
    }

    /// Inspect the response to a request sent with `sent_token`.
    ///
    /// A rejected credential (401, or 403 for an invalid token) ends the session,
    /// unless the session has moved on to another token since the request left.
    pub async fn after_response(
        &self,
        response: Response,
        sent_token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let result = error_for_status(response).await;
        if let (Err(ClientError::Unauthenticated | ClientError::Forbidden), Some(token)) =
            (&result, sent_token)
        {
            self.store.clear_if_current(token);
        }
        result
    }
}
