/// Errors surfaced by the API client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server rejected the request for lack of credentials (401).
    #[error("Not authenticated")]
    Unauthenticated,
    /// The server rejected the credential (403).
    #[error("Forbidden")]
    Forbidden,
    #[error("Failed to decode: {0}")]
    DecodeFailure(String),
    #[error("Server unavailable: {0}")]
    UpstreamUnavailable(String),
    /// The session is gone; the caller should navigate to `redirect`.
    #[error("Login required")]
    LoginRequired { redirect: String },
    #[error("Request failed with status {code}: {message}")]
    Status { code: u16, message: String },
}

impl ClientError {
    pub fn login_required() -> Self {
        Self::LoginRequired {
            redirect: super::guard::LOGIN_PATH.to_string(),
        }
    }

    pub(crate) fn upstream(e: reqwest::Error) -> Self {
        Self::UpstreamUnavailable(e.to_string())
    }
}
