//! Middleware modules for the Handy API
//!
//! - `auth`: bearer token authentication and user provisioning
//! - `rate_limit`: per-user / per-IP rate limiting
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/v1/tasks", post(handler))
//!     // Innermost: keys on the AuthContext when present
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     // Outermost: must run first so the AuthContext exists
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//! ```

mod auth;
mod rate_limit;

pub use auth::{
    auth_middleware, extract_auth_context, AuthExtractor, AuthMiddlewareError,
    AuthMiddlewareState,
};
pub use rate_limit::{rate_limit_middleware, RateLimitError, RateLimitKey, RateLimitState};
