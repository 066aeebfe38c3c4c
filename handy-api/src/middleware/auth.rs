//! Axum Middleware for Authentication
//!
//! This module provides Axum middleware that:
//! - Reads the `Authorization: Bearer` header
//! - Hands the token to the configured [`IdentityGateway`]
//! - Provisions the caller's user row and profile on first sight
//! - Injects [`AuthContext`] into request extensions
//! - Returns 401 for unauthenticated requests

use crate::auth::IdentityGateway;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use handy_market::{AuthContext, ProfileService};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub gateway: Arc<dyn IdentityGateway>,

    /// Used to provision users the gateway registered but we have not seen yet.
    pub profiles: ProfileService,
}

impl AuthMiddlewareState {
    pub fn new(gateway: Arc<dyn IdentityGateway>, profiles: ProfileService) -> Self {
        Self { gateway, profiles }
    }
}

impl std::fmt::Debug for AuthMiddlewareState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddlewareState")
            .field("gateway", &"<IdentityGateway>")
            .finish()
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Authenticate the request and inject the caller's [`AuthContext`].
///
/// 1. Extracts `Authorization: Bearer <token>`
/// 2. Validates it through the identity gateway
/// 3. Provisions the user row and empty profile (idempotent)
/// 4. Inserts the context into request extensions
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let auth_header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            AuthMiddlewareError(ApiError::unauthorized(
                "Authentication required: provide an Authorization header",
            ))
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AuthMiddlewareError(ApiError::invalid_token(
            "Authorization header must use Bearer scheme",
        ))
    })?;

    let auth_context = state
        .gateway
        .authenticate(token.trim())
        .await
        .map_err(AuthMiddlewareError)?;

    state
        .profiles
        .provision(&auth_context)
        .await
        .map_err(|e| AuthMiddlewareError(e.into()))?;

    tracing::debug!(user_id = %auth_context.user_id, role = %auth_context.role, "Authenticated");
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct AuthMiddlewareError(pub ApiError);

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for the caller's [`AuthContext`].
///
/// ```rust,no_run
/// use axum::Json;
/// use handy_api::middleware::AuthExtractor;
///
/// async fn whoami(AuthExtractor(auth): AuthExtractor) -> Json<String> {
///     Json(auth.email)
/// }
/// ```
///
/// `auth_middleware` must be applied to the route; otherwise the extractor
/// fails with a 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = AuthMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                AuthMiddlewareError(ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                ))
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extract AuthContext from request extensions.
pub fn extract_auth_context(request: &Request) -> ApiResult<&AuthContext> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::unauthorized("Auth context missing from request"))
}

// ============================================================================
// TESTS
// ============================================================================
