//! Rate Limiting Middleware
//!
//! Authenticated callers are limited per user, everyone else per client IP.
//! Limiters are created lazily and live for the process lifetime.

use crate::config::ApiConfig;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{clock::DefaultClock, Quota, RateLimiter};
use handy_core::UserId;
use handy_market::AuthContext;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectRateLimiter =
    RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, DefaultClock>;

/// Key for rate limiting - either IP address or user.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    Ip(IpAddr),
    User(UserId),
}

/// State for rate limiting middleware.
#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    limiters: Arc<DashMap<RateLimitKey, Arc<DirectRateLimiter>>>,
}

impl RateLimitState {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config: Arc::new(config),
            limiters: Arc::new(DashMap::new()),
        }
    }

    fn limit_for(&self, key: &RateLimitKey) -> u32 {
        match key {
            RateLimitKey::Ip(_) => self.config.rate_limit_unauthenticated,
            RateLimitKey::User(_) => self.config.rate_limit_authenticated,
        }
    }

    fn limiter(&self, key: RateLimitKey) -> Arc<DirectRateLimiter> {
        let limiter = self.limiters.entry(key).or_insert_with(|| {
            let per_window = NonZeroU32::new(self.limit_for(&key)).unwrap_or(NonZeroU32::MIN);
            let burst = NonZeroU32::new(self.config.rate_limit_burst).unwrap_or(NonZeroU32::MIN);
            // One cell replenishes every window / limit.
            let quota = Quota::with_period(self.config.rate_limit_window / per_window.get())
                .unwrap_or_else(|| Quota::per_minute(per_window));
            Arc::new(RateLimiter::direct(quota.allow_burst(burst)))
        });
        Arc::clone(&limiter)
    }
}

/// Error type for rate limit middleware.
#[derive(Debug)]
pub struct RateLimitError {
    /// Seconds until the next request would be allowed
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let mut response = ApiError::too_many_requests(Some(self.retry_after)).into_response();
        response.headers_mut().insert(
            HeaderName::from_static("retry-after"),
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

/// Extract client IP from request, considering proxy headers.
fn extract_client_ip(request: &Request, fallback: Option<SocketAddr>) -> IpAddr {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    fallback
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Enforce the configured quotas. Returns 429 with `Retry-After` when exceeded.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let key = match request.extensions().get::<AuthContext>() {
        Some(auth) => RateLimitKey::User(auth.user_id),
        None => RateLimitKey::Ip(extract_client_ip(&request, connect_info.map(|c| c.0))),
    };

    match state.limiter(key).check() {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from_str(&state.limit_for(&key).to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("100")),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(governor::clock::Clock::now(&DefaultClock::default()))
                .as_secs()
                .max(1);
            tracing::warn!(?key, retry_after, "Rate limit exceeded");
            Err(RateLimitError { retry_after })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(config: ApiConfig) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                RateLimitState::new(config),
                rate_limit_middleware,
            ))
    }

    fn request() -> Result<Request, String> {
        axum::http::Request::builder()
            .uri("/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(Body::empty())
            .map_err(|e| e.to_string())
    }

    #[tokio::test]
    async fn test_burst_then_429() -> Result<(), String> {
        let config = ApiConfig {
            rate_limit_enabled: true,
            rate_limit_unauthenticated: 1,
            rate_limit_burst: 2,
            ..ApiConfig::default()
        };
        let app = app(config);

        for _ in 0..2 {
            let response = app.clone().oneshot(request()?).await.map_err(|e| e.to_string())?;
            assert_eq!(response.status(), StatusCode::OK);
            assert!(response.headers().contains_key("x-ratelimit-limit"));
        }
        let response = app.oneshot(request()?).await.map_err(|e| e.to_string())?;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_never_limits() -> Result<(), String> {
        let config = ApiConfig {
            rate_limit_enabled: false,
            rate_limit_unauthenticated: 1,
            rate_limit_burst: 1,
            ..ApiConfig::default()
        };
        let app = app(config);
        for _ in 0..5 {
            let response = app.clone().oneshot(request()?).await.map_err(|e| e.to_string())?;
            assert_eq!(response.status(), StatusCode::OK);
        }
        Ok(())
    }
}
