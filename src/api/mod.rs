mod auth;
mod error;
mod posts;
mod users;

use axum::{Router, http::StatusCode, routing::get};
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::TokenCodec;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};
pub use posts::PostsState;
pub use users::UsersState;

/// Create the API router.
///
/// Public: `/login`, `/signup`, `/refresh-token`, `/health`.
/// Everything under `/users` and `/posts` requires a bearer access token.
pub fn create_api_router(
    db: Database,
    jwt: Arc<TokenCodec>,
    rate_limits: RateLimitConfig,
    no_signup: bool,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let posts_state = posts::PostsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let users_state = users::UsersState { db, jwt };

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(auth::router(auth_state, rate_limits, no_signup))
        .nest("/users", users::router(users_state))
        .nest("/posts", posts::router(posts_state))
}
