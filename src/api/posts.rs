//! Posts API.
//!
//! All endpoints require a bearer access token. Anyone signed in can read every
//! post; only the author may change or delete one.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Database, Post};
use crate::impl_has_auth_backend;
use crate::jwt::{Claim, TokenCodec};
use crate::models::{NewPost, PostUpdate, PostView};

/// State for posts endpoints.
#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
    pub jwt: Arc<TokenCodec>,
}

impl_has_auth_backend!(PostsState);

pub fn router(state: PostsState) -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
        .with_state(state)
}

// --- Helpers ---

/// Load a post and check that `claim` is its author.
async fn owned_post(db: &Database, id: i64, claim: &Claim) -> Result<Post, ApiError> {
    let post = db
        .posts()
        .get(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    if post.user_id != claim.id {
        return Err(ApiError::forbidden("You can only modify your own posts"));
    }

    Ok(post)
}

// --- Handlers ---

async fn list_posts(
    State(state): State<PostsState>,
    Auth(_claim): Auth,
) -> Result<Json<Vec<PostView>>, ApiError> {
    let posts = state.db.posts().list().await.db_err("Failed to list posts")?;
    Ok(Json(posts.into_iter().map(PostView::from).collect()))
}

async fn create_post(
    State(state): State<PostsState>,
    Auth(claim): Auth,
    Json(payload): Json<NewPost>,
) -> Result<Json<PostView>, ApiError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }

    if payload.sections.iter().any(|s| s.title.trim().is_empty()) {
        return Err(ApiError::bad_request("Section title cannot be empty"));
    }

    let post = state
        .db
        .posts()
        .create(claim.id, title, &payload.content, &payload.sections)
        .await
        .db_err("Failed to create post")?;

    info!(post_id = post.id, user_id = claim.id, "Post created");
    Ok(Json(post.into()))
}

async fn get_post(
    State(state): State<PostsState>,
    Auth(_claim): Auth,
    Path(id): Path<i64>,
) -> Result<Json<PostView>, ApiError> {
    let post = state
        .db
        .posts()
        .get(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(post.into()))
}

async fn update_post(
    State(state): State<PostsState>,
    Auth(claim): Auth,
    Path(id): Path<i64>,
    Json(payload): Json<PostUpdate>,
) -> Result<Json<PostView>, ApiError> {
    owned_post(&state.db, id, &claim).await?;

    let title = payload.title.as_deref().map(str::trim);
    if title == Some("") {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }

    state
        .db
        .posts()
        .update(id, title, payload.content.as_deref())
        .await
        .db_err("Failed to update post")?;

    let post = state
        .db
        .posts()
        .get(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(post.into()))
}

async fn delete_post(
    State(state): State<PostsState>,
    Auth(claim): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    owned_post(&state.db, id, &claim).await?;

    state
        .db
        .posts()
        .delete(id)
        .await
        .db_err("Failed to delete post")?;

    info!(post_id = id, user_id = claim.id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
