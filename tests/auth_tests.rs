//! Tests for signup, login and token refresh.

mod common;

use axum::http::StatusCode;
use common::*;
use quillpost::jwt::{Claim, TokenCodec, TokenKind, now_secs};
use quillpost::rate_limit::RateLimitConfig;
use quillpost::{ServerConfig, create_app};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_health() {
    let (app, _db, _codec) = create_test_app().await;
    let response = app
        .oneshot(empty_request("GET", "/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signup_creates_user() {
    let (app, db, _codec) = create_test_app().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/signup",
            None,
            json!({"email": "ada@example.com", "password": "hunter22", "name": "Ada"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["email"], "ada@example.com");
    assert_eq!(json["name"], "Ada");
    assert!(json.get("password").is_none());
    assert!(json.get("passwordHash").is_none());

    let user = db.users().get_by_email("ada@example.com").await.unwrap().unwrap();
    assert_ne!(user.password_hash, "hunter22");
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let (app, db, _codec) = create_test_app().await;
    create_user(&db, "ada@example.com", "pw").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/signup",
            None,
            json!({"email": "ADA@example.com", "password": "other"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_signup_validation() {
    let (app, _db, _codec) = create_test_app().await;

    for body in [
        json!({"email": "", "password": "pw"}),
        json!({"email": "no-at-sign", "password": "pw"}),
        json!({"email": "ada@example.com", "password": ""}),
    ] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/signup", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_signup_disabled() {
    let db = test_db().await;
    let config = ServerConfig {
        no_signup: true,
        ..test_config(db)
    };
    let app = create_app(&config).unwrap();

    let response = app
        .oneshot(json_request(
            "POST",
            "/signup",
            None,
            json!({"email": "ada@example.com", "password": "pw"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_returns_verifiable_pair() {
    let (app, db, codec) = create_test_app().await;
    let id = create_user(&db, "ada@example.com", "hunter22").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({"email": "ada@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let access = codec
        .verify(json["token"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    let refresh = codec
        .verify(json["refreshToken"].as_str().unwrap(), TokenKind::Refresh)
        .unwrap();
    assert_eq!(access.id, id);
    assert_eq!(refresh.email, "ada@example.com");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, db, _codec) = create_test_app().await;
    create_user(&db, "ada@example.com", "hunter22").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({"email": "ada@example.com", "password": "wrong"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            json!({"email": "nobody@example.com", "password": "hunter22"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_issues_new_pair() {
    let (app, db, codec) = create_test_app().await;
    let (id, pair) = create_authenticated_user(&db, &codec, "ada@example.com").await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/refresh-token",
            None,
            json!({"refreshToken": pair.refresh_token}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let claim = codec
        .verify(json["token"].as_str().unwrap(), TokenKind::Access)
        .unwrap();
    assert_eq!(claim.id, id);
    assert!(
        codec
            .verify(json["refreshToken"].as_str().unwrap(), TokenKind::Refresh)
            .is_ok()
    );
}

#[tokio::test]
async fn test_refresh_without_token_is_unauthorized() {
    let (app, _db, _codec) = create_test_app().await;

    for body in [json!({}), json!({"refreshToken": ""})] {
        let response = app
            .clone()
            .oneshot(json_request("POST", "/refresh-token", None, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app
        .oneshot(empty_request("POST", "/refresh-token", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_bad_tokens() {
    let (app, db, codec) = create_test_app().await;
    let (id, pair) = create_authenticated_user(&db, &codec, "ada@example.com").await;
    let claim = Claim {
        id,
        email: "ada@example.com".into(),
    };

    let foreign = TokenCodec::new(
        b"some-other-access-secret-0123456789",
        b"some-other-refresh-secret-0123456789",
    )
    .unwrap();
    let forged = foreign.issue(&claim, TokenKind::Refresh).unwrap().token;

    let long_ago = now_secs().unwrap() - 30 * 24 * 3600;
    let expired = codec
        .issue_at(&claim, TokenKind::Refresh, long_ago)
        .unwrap()
        .token;

    // An access token is not a refresh token
    for token in [forged, expired, pair.token, "not.a.jwt".to_string()] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/refresh-token",
                None,
                json!({"refreshToken": token}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_login_rate_limited_per_ip() {
    let db = test_db().await;
    create_user(&db, "ada@example.com", "hunter22").await;
    let config = ServerConfig {
        rate_limits: RateLimitConfig::per_minute(2, 0),
        ..test_config(db)
    };
    let app = create_app(&config).unwrap();

    let login = |ip: &str| {
        let mut request = json_request(
            "POST",
            "/login",
            None,
            json!({"email": "ada@example.com", "password": "wrong"}),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        request
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(login("10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.clone().oneshot(login("10.0.0.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.oneshot(login("10.0.0.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
