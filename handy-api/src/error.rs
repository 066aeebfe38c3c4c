//! Error Types for Handy API
//!
//! This module defines error handling for the API layer:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - The mapping from domain `HandyError` onto HTTP statuses
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use handy_core::{ErrorKind, HandyError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code and represents
/// a category of error that can occur during API operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Request is authenticated but the actor may not perform the operation
    Forbidden,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Field format is incorrect
    InvalidFormat,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Operation conflicts with the entity's current state
    StateConflict,

    /// Requested status change is not in the lifecycle table
    InvalidTransition,

    /// The helper already applied to this task
    DuplicateApplication,

    /// The reviewer already reviewed this task
    DuplicateReview,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Request rate limit exceeded
    TooManyRequests,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationFailed | ErrorCode::InvalidInput | ErrorCode::InvalidFormat => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::EntityNotFound => StatusCode::NOT_FOUND,

            ErrorCode::StateConflict
            | ErrorCode::InvalidTransition
            | ErrorCode::DuplicateApplication
            | ErrorCode::DuplicateReview => StatusCode::CONFLICT,

            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,

            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::InvalidToken => "Invalid authentication token",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::StateConflict => "Operation conflicts with current state",
            ErrorCode::InvalidTransition => "Invalid status change",
            ErrorCode::DuplicateApplication => "You have already applied to this task",
            ErrorCode::DuplicateReview => "You have already reviewed this task",
            ErrorCode::InternalError => "Something went wrong, please try again",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::TooManyRequests => "Rate limit exceeded",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
///
/// This type is returned by all API endpoints when an error occurs.
/// It provides a consistent error format across REST and WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(utoipa::ToSchema)]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message, safe to show as-is
    pub message: String,

    /// Optional additional details (offending field, entity id, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityNotFound, message)
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    /// Create an InternalError. The message is logged, never returned.
    pub fn internal_error(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(error = %message, "Internal error");
        Self::from_code(ErrorCode::InternalError)
    }

    pub fn too_many_requests(retry_after_secs: Option<u64>) -> Self {
        let message = match retry_after_secs {
            Some(secs) => format!("Rate limit exceeded. Retry after {} seconds", secs),
            None => "Rate limit exceeded".to_string(),
        };
        Self::new(ErrorCode::TooManyRequests, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Validation => ErrorCode::ValidationFailed,
            ErrorKind::Forbidden => ErrorCode::Forbidden,
            ErrorKind::InvalidState => ErrorCode::StateConflict,
            ErrorKind::InvalidTransition => ErrorCode::InvalidTransition,
            ErrorKind::DuplicateApplication => ErrorCode::DuplicateApplication,
            ErrorKind::DuplicateReview => ErrorCode::DuplicateReview,
            ErrorKind::NotFound => ErrorCode::EntityNotFound,
            ErrorKind::Internal => ErrorCode::InternalError,
        }
    }
}

/// Domain errors carry their own user-facing sentence; internals are logged
/// in full and replaced by the generic retry prompt.
impl From<HandyError> for ApiError {
    fn from(err: HandyError) -> Self {
        let code = ErrorCode::from(err.kind());
        if code == ErrorCode::InternalError {
            tracing::error!(error = %err, "Domain operation failed");
            return ApiError::from_code(code);
        }
        let details = match &err {
            HandyError::Validation(
                handy_core::ValidationError::RequiredFieldMissing { field }
                | handy_core::ValidationError::InvalidValue { field, .. },
            ) => Some(serde_json::json!({ "field": field })),
            HandyError::Storage(handy_core::StorageError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({ "entity_type": entity_type, "id": id }))
            }
            _ => None,
        };
        ApiError {
            code,
            message: err.user_message(),
            details,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::invalid_format("id", &format!("valid UUID: {}", err))
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
