#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use quillpost::db::{Database, NewUser};
use quillpost::jwt::{Claim, TokenCodec};
use quillpost::models::TokenPair;
use quillpost::password::hash_password;
use quillpost::rate_limit::RateLimitConfig;
use quillpost::{ServerConfig, create_app};

pub const ACCESS_SECRET: &[u8] = b"integration-access-secret-0123456789";
pub const REFRESH_SECRET: &[u8] = b"integration-refresh-secret-0123456789";

/// Codec sharing the test server's secrets.
pub fn codec() -> TokenCodec {
    TokenCodec::new(ACCESS_SECRET, REFRESH_SECRET).unwrap()
}

pub async fn test_db() -> Database {
    Database::open(":memory:")
        .await
        .expect("Failed to open test database")
}

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: ACCESS_SECRET.to_vec(),
        jwt_refresh_secret: REFRESH_SECRET.to_vec(),
        no_signup: false,
        rate_limits: RateLimitConfig::unlimited(),
        cors_origins: Vec::new(),
    }
}

/// Create a test app and return (app, db, codec).
pub async fn create_test_app() -> (Router, Database, TokenCodec) {
    let db = test_db().await;
    let app = create_app(&test_config(db.clone())).unwrap();
    (app, db, codec())
}

/// Insert a user directly and return its id.
pub async fn create_user(db: &Database, email: &str, password: &str) -> i64 {
    let hash = hash_password(password).unwrap();
    db.users()
        .create(&NewUser {
            email,
            password_hash: &hash,
            name: None,
            username: None,
            phone: None,
            avatar: None,
        })
        .await
        .unwrap()
}

/// Create a user and return (user_id, token pair).
pub async fn create_authenticated_user(
    db: &Database,
    codec: &TokenCodec,
    email: &str,
) -> (i64, TokenPair) {
    let id = create_user(db, email, "correct horse battery staple").await;
    let pair = codec
        .issue_pair(&Claim {
            id,
            email: email.to_string(),
        })
        .unwrap();
    (id, pair)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
