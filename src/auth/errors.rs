//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `code` of a 401 for a request without a bearer token.
pub const MISSING_TOKEN_CODE: &str = "missing_token";

/// `code` of a 403 for a bearer token that failed verification. Other 403s
/// (such as editing someone else's post) never carry it.
pub const INVALID_TOKEN_CODE: &str = "invalid_token";

/// Rejection for protected routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer credential was supplied.
    Unauthenticated,
    /// A credential was supplied but failed verification.
    Forbidden,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => MISSING_TOKEN_CODE,
            AuthError::Forbidden => INVALID_TOKEN_CODE,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "Not authenticated",
            AuthError::Forbidden => "Invalid or expired token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
            code: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
                code: self.code(),
            }),
        )
            .into_response()
    }
}
