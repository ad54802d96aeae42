//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use super::bearer::bearer_token;
use super::errors::AuthError;
use super::state::HasAuthBackend;
use crate::jwt::{Claim, TokenCodec, TokenKind};

/// Verify the bearer access token in `headers`.
pub fn authenticate_request(headers: &HeaderMap, jwt: &TokenCodec) -> Result<Claim, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;

    jwt.verify(token, TokenKind::Access).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        AuthError::Forbidden
    })
}

/// Extractor for API endpoints that require authentication.
/// Holds the verified claim of the access token.
pub struct Auth(pub Claim);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(&parts.headers, state.jwt()).map(Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header};

    fn codec() -> TokenCodec {
        TokenCodec::new(b"access-secret-for-testing", b"refresh-secret-for-testing").unwrap()
    }

    fn with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn claim() -> Claim {
        Claim {
            id: 1,
            email: "alice@example.com".into(),
        }
    }

    #[test]
    fn test_missing_credential_is_unauthenticated() {
        let result = authenticate_request(&HeaderMap::new(), &codec());
        assert_eq!(result.unwrap_err(), AuthError::Unauthenticated);
    }

    #[test]
    fn test_valid_access_token() {
        let codec = codec();
        let token = codec.issue(&claim(), TokenKind::Access).unwrap().token;
        assert_eq!(authenticate_request(&with_bearer(&token), &codec).unwrap(), claim());
    }

    #[test]
    fn test_refresh_token_is_forbidden() {
        let codec = codec();
        let token = codec.issue(&claim(), TokenKind::Refresh).unwrap().token;
        assert_eq!(
            authenticate_request(&with_bearer(&token), &codec).unwrap_err(),
            AuthError::Forbidden
        );
    }

    #[test]
    fn test_garbage_token_is_forbidden() {
        assert_eq!(
            authenticate_request(&with_bearer("garbage"), &codec()).unwrap_err(),
            AuthError::Forbidden
        );
    }
}
