//! REST API Routes Module
//!
//! Route handlers organized by resource. Every module exposes a
//! `create_router()` over [`AppState`] that is merged under `/api/v1`.

pub mod applications;
pub mod categories;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod profiles;
pub mod reviews;
pub mod tasks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use handy_market::Marketplace;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::auth::{AuthConfig, IdentityGateway, JwtIdentityGateway};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth_middleware, rate_limit_middleware, AuthMiddlewareState, RateLimitState};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};
use crate::ws::ws_handler;

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// ============================================================================
// PRODUCTION VALIDATION
// ============================================================================

/// `HANDY_ENVIRONMENT=production` (or `prod`) turns on startup checks.
fn is_production_environment() -> bool {
    std::env::var("HANDY_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

fn validate_api_config_for_production(config: &ApiConfig) -> ApiResult<()> {
    if config.cors_origins.is_empty() {
        return Err(ApiError::invalid_input(
            "CORS origins not configured for production. Set HANDY_CORS_ORIGINS.",
        ));
    }
    if !config.rate_limit_enabled {
        tracing::warn!(
            "Rate limiting is disabled in production. \
             Set HANDY_RATE_LIMIT_ENABLED=true to enable it."
        );
    }
    Ok(())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builds the API router with auth and rate limiting on every `/api/v1` route.
///
/// Health, metrics and the OpenAPI document stay public.
pub struct SecureRouterBuilder {
    state: AppState,
    api_config: ApiConfig,
    auth_state: AuthMiddlewareState,
    rate_limit_state: RateLimitState,
}

impl SecureRouterBuilder {
    pub fn new(
        marketplace: Marketplace,
        api_config: ApiConfig,
        gateway: Arc<dyn IdentityGateway>,
    ) -> Self {
        let auth_state = AuthMiddlewareState::new(gateway, marketplace.profiles.clone());
        let rate_limit_state = RateLimitState::new(api_config.clone());
        Self {
            state: AppState::new(marketplace),
            api_config,
            auth_state,
            rate_limit_state,
        }
    }

    fn build_resource_routes() -> Router<AppState> {
        Router::new()
            .merge(tasks::create_router())
            .merge(applications::create_router())
            .merge(messages::create_router())
            .merge(reviews::create_router())
            .merge(profiles::create_router())
            .merge(categories::create_router())
            .merge(notifications::create_router())
            .route("/ws", get(ws_handler))
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS
    /// 2. TraceLayer and observability
    /// 3. Auth (only on /api/v1/*)
    /// 4. Rate limiting, keyed on the authenticated user when there is one
    pub fn build(self) -> Router {
        let api_routes = Self::build_resource_routes()
            .layer(from_fn_with_state(self.rate_limit_state.clone(), rate_limit_middleware))
            .layer(from_fn_with_state(self.auth_state, auth_middleware));

        let public_routes = Router::new()
            .nest("/health", health::create_router())
            .route("/metrics", get(metrics_handler))
            .route("/openapi.json", get(openapi_json))
            .layer(from_fn_with_state(self.rate_limit_state, rate_limit_middleware));

        Router::new()
            .nest("/api/v1", api_routes)
            .merge(public_routes)
            .with_state(self.state)
            .layer(from_fn(observability_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(build_cors_layer(&self.api_config))
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow everything (development).
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("retry-after"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router, verifying bearer tokens with `auth_config`.
///
/// - `/api/v1/*` requires a valid token
/// - `/health/*`, `/metrics` and `/openapi.json` are public
///
/// In production (`HANDY_ENVIRONMENT=production`) weak secrets and missing
/// CORS origins are startup errors.
pub fn create_api_router(
    marketplace: Marketplace,
    api_config: &ApiConfig,
    auth_config: AuthConfig,
) -> ApiResult<Router> {
    if is_production_environment() {
        auth_config.validate_for_production()?;
        validate_api_config_for_production(api_config)?;
    }
    let gateway: Arc<dyn IdentityGateway> = Arc::new(JwtIdentityGateway::new(auth_config));
    Ok(SecureRouterBuilder::new(marketplace, api_config.clone(), gateway).build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_requires_cors_origins() {
        let mut config = ApiConfig::default();
        assert!(validate_api_config_for_production(&config).is_err());
        config.cors_origins = vec!["https://app.handy.run".to_string()];
        assert!(validate_api_config_for_production(&config).is_ok());
    }
}
