//! Error types for Handy operations

use crate::{ApplicationId, EntityType, TaskId, TaskStatus, UserId};
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity_type:?} with id {id}")]
    NotFound { entity_type: EntityType, id: String },

    #[error("Insert failed for {entity_type:?}: {reason}")]
    InsertFailed { entity_type: EntityType, reason: String },

    #[error("Update failed for {entity_type:?} with id {id}: {reason}")]
    UpdateFailed {
        entity_type: EntityType,
        id: String,
        reason: String,
    },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Shorthand for a missing entity.
    pub fn not_found(entity_type: EntityType, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }
}

/// Validation errors for malformed or missing input. Never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        ValidationError::RequiredFieldMissing {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Workflow errors: the actor or the entity state does not allow the operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Forbidden: {action} ({reason})")]
    Forbidden { action: String, reason: String },

    #[error("{entity_type:?} {id} is not in a valid state: {reason}")]
    InvalidState {
        entity_type: EntityType,
        id: Uuid,
        reason: String,
    },

    #[error("Task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Helper {helper_id} has already applied to task {task_id}")]
    DuplicateApplication { task_id: TaskId, helper_id: UserId },

    #[error("User {reviewer_id} has already reviewed task {task_id}")]
    DuplicateReview { task_id: TaskId, reviewer_id: UserId },
}

impl WorkflowError {
    pub fn forbidden(action: impl Into<String>, reason: impl Into<String>) -> Self {
        WorkflowError::Forbidden {
            action: action.into(),
            reason: reason.into(),
        }
    }

    pub fn task_state(task_id: TaskId, reason: impl Into<String>) -> Self {
        WorkflowError::InvalidState {
            entity_type: EntityType::Task,
            id: task_id.as_uuid(),
            reason: reason.into(),
        }
    }

    pub fn application_state(application_id: ApplicationId, reason: impl Into<String>) -> Self {
        WorkflowError::InvalidState {
            entity_type: EntityType::Application,
            id: application_id.as_uuid(),
            reason: reason.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Handy errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandyError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Handy operations.
pub type HandyResult<T> = Result<T, HandyError>;

/// Coarse error category, the taxonomy callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Forbidden,
    InvalidState,
    InvalidTransition,
    DuplicateApplication,
    DuplicateReview,
    NotFound,
    Internal,
}

impl HandyError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandyError::Validation(_) => ErrorKind::Validation,
            HandyError::Workflow(WorkflowError::Forbidden { .. }) => ErrorKind::Forbidden,
            HandyError::Workflow(WorkflowError::InvalidState { .. }) => ErrorKind::InvalidState,
            HandyError::Workflow(WorkflowError::InvalidTransition { .. }) => {
                ErrorKind::InvalidTransition
            }
            HandyError::Workflow(WorkflowError::DuplicateApplication { .. }) => {
                ErrorKind::DuplicateApplication
            }
            HandyError::Workflow(WorkflowError::DuplicateReview { .. }) => {
                ErrorKind::DuplicateReview
            }
            HandyError::Storage(StorageError::NotFound { .. }) => ErrorKind::NotFound,
            HandyError::Storage(_) | HandyError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Sentence safe to show to an end user as-is.
    ///
    /// Infrastructure failures collapse into a generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            HandyError::Validation(ValidationError::RequiredFieldMissing { field }) => {
                format!("Please provide a value for {}", field.replace('_', " "))
            }
            HandyError::Validation(ValidationError::InvalidValue { field, reason }) => {
                format!("Invalid {}: {}", field.replace('_', " "), reason)
            }
            HandyError::Validation(ValidationError::ConstraintViolation { reason, .. }) => {
                reason.clone()
            }
            HandyError::Workflow(WorkflowError::Forbidden { action, .. }) => {
                format!("You are not allowed to {}", action)
            }
            HandyError::Workflow(WorkflowError::InvalidState { reason, .. }) => reason.clone(),
            HandyError::Workflow(WorkflowError::InvalidTransition { from, to, .. }) => {
                format!("A {} task cannot be marked {}", from, to)
            }
            HandyError::Workflow(WorkflowError::DuplicateApplication { .. }) => {
                "You have already applied to this task".to_string()
            }
            HandyError::Workflow(WorkflowError::DuplicateReview { .. }) => {
                "You have already reviewed this task".to_string()
            }
            HandyError::Storage(StorageError::NotFound { entity_type, .. }) => {
                format!("{} not found", entity_type)
            }
            HandyError::Storage(_) | HandyError::Config(_) => {
                "Something went wrong, please try again".to_string()
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
