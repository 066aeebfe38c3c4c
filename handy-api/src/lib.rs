//! Handy API - REST/WebSocket API Layer
//!
//! Exposes the marketplace services over Axum: JSON endpoints under
//! `/api/v1`, a WebSocket for live topic subscriptions, health probes,
//! Prometheus metrics and the OpenAPI document.
//!
//! Every `/api/v1` request carries a bearer token verified by an
//! [`IdentityGateway`]; the domain never sees raw credentials.

#[macro_use]
pub mod macros;

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod ws;

// Re-export commonly used types
pub use auth::{
    generate_jwt_token, validate_jwt_token, AuthConfig, Claims, IdentityGateway,
    JwtIdentityGateway,
};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareState};
pub use openapi::ApiDoc;
pub use routes::{create_api_router, SecureRouterBuilder};
pub use state::AppState;
pub use ws::WsState;
