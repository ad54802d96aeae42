//! Rate limiting for the login and signup endpoints.
//!
//! Uses governor's keyed token bucket with per-IP tracking to slow down credential
//! stuffing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc};

use crate::api::ApiError;
use crate::auth::extract_client_ip;

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Rate limiting configuration. A `None` limiter means the endpoint is unlimited.
#[derive(Clone, Default)]
pub struct RateLimitConfig {
    /// Per-IP limiter for `/login`
    pub login: Option<Arc<IpLimiter>>,
    /// Per-IP limiter for `/signup`
    pub signup: Option<Arc<IpLimiter>>,
}

impl RateLimitConfig {
    /// Build limiters allowing the given number of requests per minute per IP.
    /// Zero disables limiting for that endpoint.
    pub fn per_minute(login: u32, signup: u32) -> Self {
        Self {
            login: limiter(login),
            signup: limiter(signup),
        }
    }

    /// No limits at all (tests).
    pub fn unlimited() -> Self {
        Self::default()
    }
}

fn limiter(per_minute: u32) -> Option<Arc<IpLimiter>> {
    NonZeroU32::new(per_minute).map(|n| Arc::new(RateLimiter::keyed(Quota::per_minute(n))))
}

fn check(limiter: Option<&IpLimiter>, request: &Request, message: &str) -> Result<(), ApiError> {
    let Some(limiter) = limiter else {
        return Ok(());
    };

    let ip = extract_client_ip(request);
    limiter.check_key(&ip).map_err(|_| {
        tracing::warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
        ApiError::too_many_requests(message)
    })
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        config.login.as_deref(),
        &request,
        "Too many login attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Middleware for rate limiting user creation.
pub async fn rate_limit_signup(
    State(config): State<RateLimitConfig>,
    request: Request,
    next: Next,
) -> Response {
    match check(
        config.signup.as_deref(),
        &request,
        "Too many signup attempts. Please wait before trying again.",
    ) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_disables_limiter() {
        let config = RateLimitConfig::per_minute(0, 3);
        assert!(config.login.is_none());
        assert!(config.signup.is_some());
    }

    #[test]
    fn test_burst_then_reject() {
        let config = RateLimitConfig::per_minute(2, 0);
        let limiter = config.login.unwrap();
        let key = "10.0.0.1".to_string();

        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_err());

        // Other IPs have their own bucket
        assert!(limiter.check_key(&"10.0.0.2".to_string()).is_ok());
    }
}
