//! JWT token generation and validation.
//!
//! Two token kinds share one claim shape but are signed with independent secrets:
//! - Access tokens: short-lived (4 minutes), attached to every protected request
//! - Refresh tokens: long-lived (7 days), only accepted by the refresh endpoint
//!
//! The `peek_*` functions decode a payload WITHOUT checking its signature. They exist
//! so the client can tell whether a token is expired without a round trip, and must
//! never be used to make a trust decision.

use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::TokenPair;

/// Token kind. Each kind is signed with its own secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Access token duration: 4 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 4 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

impl TokenKind {
    pub fn duration(&self) -> u64 {
        match self {
            TokenKind::Access => ACCESS_TOKEN_DURATION_SECS,
            TokenKind::Refresh => REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

/// Identity carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub id: i64,
    pub email: String,
}

/// Full JWT payload as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenClaims {
    id: i64,
    email: String,
    typ: TokenKind,
    iat: u64,
    exp: u64,
}

/// Payload fields readable without the secret.
#[derive(Debug, Clone, Deserialize)]
pub struct UnverifiedClaims {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub exp: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenCodec {
    /// Create a codec from the two secrets. They must differ.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Result<Self, JwtError> {
        if access_secret == refresh_secret {
            return Err(JwtError::SharedSecret);
        }
        Ok(Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
        })
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign a token of the given kind, issued now.
    pub fn issue(&self, claim: &Claim, kind: TokenKind) -> Result<IssuedToken, JwtError> {
        self.issue_at(claim, kind, now_secs()?)
    }

    /// Sign a token of the given kind as if issued at `issued_at` (Unix seconds).
    pub fn issue_at(
        &self,
        claim: &Claim,
        kind: TokenKind,
        issued_at: u64,
    ) -> Result<IssuedToken, JwtError> {
        let exp = issued_at + kind.duration();
        let claims = TokenClaims {
            id: claim.id,
            email: claim.email.clone(),
            typ: kind,
            iat: issued_at,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.keys(kind).encoding)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Issue a fresh access + refresh pair for the claim.
    pub fn issue_pair(&self, claim: &Claim) -> Result<TokenPair, JwtError> {
        let now = now_secs()?;
        Ok(TokenPair {
            token: self.issue_at(claim, TokenKind::Access, now)?.token,
            refresh_token: self.issue_at(claim, TokenKind::Refresh, now)?.token,
        })
    }

    /// Verify signature, expiry and kind, returning the embedded claim.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claim, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)
                .map_err(JwtError::from_decode)?;

        if token_data.claims.typ != kind {
            return Err(JwtError::WrongTokenType);
        }

        Ok(Claim {
            id: token_data.claims.id,
            email: token_data.claims.email,
        })
    }
}

/// Decode the payload segment WITHOUT verifying the signature.
pub fn peek_claims(token: &str) -> Result<UnverifiedClaims, JwtError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(JwtError::Malformed),
    };

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| JwtError::Malformed)?;

    serde_json::from_slice(&bytes).map_err(|_| JwtError::Malformed)
}

/// Unverified expiry timestamp (Unix seconds) of a token.
pub fn peek_expiry(token: &str) -> Result<u64, JwtError> {
    peek_claims(token).map(|claims| claims.exp)
}

/// Whether a token should be treated as expired at `now`.
/// Tokens that cannot be decoded count as expired.
pub fn is_expired(token: Option<&str>, now: u64) -> bool {
    match token.map(peek_expiry) {
        Some(Ok(exp)) => exp <= now,
        _ => true,
    }
}

/// Current Unix time in seconds.
pub fn now_secs() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("Invalid token signature")]
    InvalidSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Malformed token")]
    Malformed,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Access and refresh secrets must differ")]
    SharedSecret,
    #[error("System time error")]
    TimeError,
}

impl JwtError {
    fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Malformed,
        }
    }
}
