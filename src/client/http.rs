use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use url::Url;

use super::error::ClientError;
use crate::auth::INVALID_TOKEN_CODE;
use crate::models::{LoginRequest, RefreshRequest, SignupRequest, TokenPair, UserProfile};

/// Exchanges a refresh token for a new pair.
pub trait RefreshApi: Send + Sync {
    fn refresh(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<TokenPair, ClientError>> + Send;
}

/// HTTP access to the public auth endpoints.
#[derive(Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    base: Url,
}

impl HttpAuthApi {
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    pub fn with_client(http: reqwest::Client, mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { http, base }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve an API path such as `/posts/3` against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::DecodeFailure(format!("invalid path {path}: {e}")))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint("/login")?)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::upstream)?;
        decode_json(error_for_status(response).await?).await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/signup")?)
            .json(request)
            .send()
            .await
            .map_err(ClientError::upstream)?;
        decode_json(error_for_status(response).await?).await
    }
}

impl RefreshApi for HttpAuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let body = RefreshRequest {
            refresh_token: Some(refresh_token.to_string()),
        };
        let response = self
            .http
            .post(self.endpoint("/refresh-token")?)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::upstream)?;
        decode_json(error_for_status(response).await?).await
    }
}

/// Map non-success statuses to errors.
///
/// 401 is `Unauthenticated`. A 403 is `Forbidden` only when the server says the
/// bearer token itself was rejected; other 403s are plain `Status` errors.
pub(crate) async fn error_for_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthenticated);
    }

    let body = response.json::<serde_json::Value>().await.ok();
    let field = |name: &str| {
        body.as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    if status == StatusCode::FORBIDDEN && field("code").as_deref() == Some(INVALID_TOKEN_CODE) {
        return Err(ClientError::Forbidden);
    }

    let message = field("error")
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
    Err(ClientError::Status {
        code: status.as_u16(),
        message,
    })
}

pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::DecodeFailure(e.to_string()))
}
