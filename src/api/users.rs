use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, ResultExt, validate_email};
use crate::auth::Auth;
use crate::db::{Database, UserChanges, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;
use crate::models::{UserProfile, UserUpdate};
use crate::password::hash_password_blocking;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<TokenCodec>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .with_state(state)
}

async fn list_users(
    State(state): State<UsersState>,
    Auth(_claim): Auth,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.db.users().list().await.db_err("Failed to list users")?;
    Ok(Json(users.iter().map(|u| u.to_profile()).collect()))
}

async fn get_user(
    State(state): State<UsersState>,
    Auth(_claim): Auth,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user.to_profile()))
}

async fn update_user(
    State(state): State<UsersState>,
    Auth(claim): Auth,
    Path(id): Path<i64>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<UserProfile>, ApiError> {
    if claim.id != id {
        return Err(ApiError::forbidden("You can only update your own account"));
    }

    let email = payload.email.as_deref().map(str::trim);
    if let Some(email) = email {
        validate_email(email)?;
    }

    let password_hash = match payload.password.as_deref() {
        Some("") => return Err(ApiError::bad_request("Password cannot be empty")),
        Some(password) => Some(
            hash_password_blocking(password.to_string())
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to hash password");
                    ApiError::internal("Failed to update user")
                })?,
        ),
        None => None,
    };

    let changes = UserChanges {
        email,
        password_hash: password_hash.as_deref(),
        name: payload.name.as_deref(),
        username: payload.username.as_deref(),
        phone: payload.phone.as_deref(),
        avatar: payload.avatar.as_deref(),
    };

    match state.db.users().update(id, &changes).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::not_found("User not found")),
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("Email is already registered"));
        }
        Err(e) => return Err(ApiError::db_error("Failed to update user", e)),
    }

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = id, "User updated");
    Ok(Json(user.to_profile()))
}

async fn delete_user(
    State(state): State<UsersState>,
    Auth(claim): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if claim.id != id {
        return Err(ApiError::forbidden("You can only delete your own account"));
    }

    let deleted = state
        .db
        .users()
        .delete(id)
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
