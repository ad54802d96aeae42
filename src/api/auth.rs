//! Public authentication endpoints.
//!
//! - POST `/signup` - Create a user
//! - POST `/login` - Exchange email + password for a token pair
//! - POST `/refresh-token` - Exchange a refresh token for a brand new pair
//!
//! Rotation reissues both tokens but keeps no server-side record, so a refresh token
//! that has been rotated away stays usable until its own expiry.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::post,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::error::{ApiError, ResultExt, validate_email};
use crate::db::{Database, NewUser, is_unique_violation};
use crate::jwt::{Claim, TokenCodec, TokenKind};
use crate::models::{LoginRequest, RefreshRequest, SignupRequest, TokenPair};
use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_signup};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<TokenCodec>,
}

pub fn router(state: AuthState, rate_limits: RateLimitConfig, no_signup: bool) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_login,
        ));

    let refresh_router = Router::new()
        .route("/refresh-token", post(refresh_token))
        .with_state(state.clone());

    let router = Router::new().merge(login_router).merge(refresh_router);

    if no_signup {
        router
    } else {
        let signup_router = Router::new()
            .route("/signup", post(signup))
            .with_state(state)
            .layer(middleware::from_fn_with_state(rate_limits, rate_limit_signup));
        router.merge(signup_router)
    }
}

fn issue_pair(jwt: &TokenCodec, claim: &Claim) -> Result<TokenPair, ApiError> {
    jwt.issue_pair(claim).map_err(|e| {
        error!(error = %e, "Failed to generate tokens");
        ApiError::internal("Failed to generate token")
    })
}

async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload.email.trim();
    validate_email(email)?;

    if payload.password.is_empty() {
        return Err(ApiError::bad_request("Password cannot be empty"));
    }

    let password_hash = hash_password_blocking(payload.password.clone())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            ApiError::internal("Failed to create user")
        })?;

    let new_user = NewUser {
        email,
        password_hash: &password_hash,
        name: payload.name.as_deref(),
        username: payload.username.as_deref(),
        phone: payload.phone.as_deref(),
        avatar: payload.avatar.as_deref(),
    };

    let id = match state.db.users().create(&new_user).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email is already registered"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to create user", e)),
    };

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to load new user")?
        .ok_or_else(|| ApiError::internal("User vanished after creation"))?;

    info!(user_id = id, "User signed up");
    Ok((StatusCode::CREATED, Json(user.to_profile())))
}

async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let user = state
        .db
        .users()
        .get_by_email(payload.email.trim())
        .await
        .db_err("Failed to look up user")?;

    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let verified = verify_password_blocking(payload.password, stored).await;

    let Some(user) = user.filter(|_| verified) else {
        debug!("Login rejected");
        return Err(ApiError::unauthorized("Unauthorized"));
    };

    let claim = Claim {
        id: user.id,
        email: user.email,
    };
    let pair = issue_pair(&state.jwt, &claim)?;

    info!(user_id = claim.id, "User logged in");
    Ok(Json(pair))
}

/// A missing or unparsable body counts as "no refresh token" (401).
async fn refresh_token(
    State(state): State<AuthState>,
    body: Bytes,
) -> Result<Json<TokenPair>, ApiError> {
    let payload: RefreshRequest = serde_json::from_slice(&body).unwrap_or_default();

    let refresh_token = payload
        .refresh_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))?;

    let claim = state
        .jwt
        .verify(refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            debug!(error = %e, "Refresh token rejected");
            ApiError::forbidden("Invalid or expired refresh token")
        })?;

    let pair = issue_pair(&state.jwt, &claim)?;
    debug!(user_id = claim.id, "Token pair rotated");
    Ok(Json(pair))
}
