//! Enum types for Handy entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error when parsing an enum from its database string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumParseError {
    pub enum_name: &'static str,
    pub value: String,
}

impl fmt::Display for EnumParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid {}: {}", self.enum_name, self.value)
    }
}

impl std::error::Error for EnumParseError {}

fn parse_error(enum_name: &'static str, value: &str) -> EnumParseError {
    EnumParseError {
        enum_name,
        value: value.to_string(),
    }
}

/// Normalize a status string for lenient matching: lowercase, `_` and ` ` become `-`.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace(['_', ' '], "-")
}

// ============================================================================
// USER ENUMS
// ============================================================================

/// Role of a user. Immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Creates tasks that need help
    Poster,
    /// Browses and applies to tasks
    Helper,
    /// Platform operator
    Admin,
}

impl UserRole {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            UserRole::Poster => "poster",
            UserRole::Helper => "helper",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "poster" => Ok(UserRole::Poster),
            "helper" => Ok(UserRole::Helper),
            "admin" => Ok(UserRole::Admin),
            _ => Err(parse_error("user role", s)),
        }
    }
}

/// Account status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Suspended,
    Deactivated,
}

impl UserStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::Deactivated => "deactivated",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "active" => Ok(UserStatus::Active),
            "suspended" => Ok(UserStatus::Suspended),
            "deactivated" | "inactive" => Ok(UserStatus::Deactivated),
            _ => Err(parse_error("user status", s)),
        }
    }
}

// ============================================================================
// TASK STATUS
// ============================================================================

/// Lifecycle status of a task.
///
/// ```text
/// Open ──accept──→ InProgress ──complete──→ Completed
///   │                  │
///   └────cancel────────┴──────────────────→ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum TaskStatus {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "in-progress", alias = "in_progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "open" => Ok(TaskStatus::Open),
            "in-progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "completed" | "complete" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(parse_error("task status", s)),
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// The task lifecycle transition table.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Open, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::Open, TaskStatus::Cancelled)
                | (TaskStatus::InProgress, TaskStatus::Cancelled)
        )
    }
}

// ============================================================================
// APPLICATION STATUS
// ============================================================================

/// Status of a helper's application. Immutable once non-pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "accepted" => Ok(ApplicationStatus::Accepted),
            "rejected" => Ok(ApplicationStatus::Rejected),
            _ => Err(parse_error("application status", s)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

// ============================================================================
// BUDGET / HELPER / NOTIFICATION ENUMS
// ============================================================================

/// How a task's budget is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum BudgetType {
    Fixed,
    Hourly,
}

impl BudgetType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            BudgetType::Fixed => "fixed",
            BudgetType::Hourly => "hourly",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "fixed" => Ok(BudgetType::Fixed),
            "hourly" => Ok(BudgetType::Hourly),
            _ => Err(parse_error("budget type", s)),
        }
    }
}

/// Progress of a helper's background check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum BackgroundCheckStatus {
    #[default]
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

impl BackgroundCheckStatus {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            BackgroundCheckStatus::NotStarted => "not_started",
            BackgroundCheckStatus::Pending => "pending",
            BackgroundCheckStatus::Approved => "approved",
            BackgroundCheckStatus::Rejected => "rejected",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match normalize(s).as_str() {
            "not-started" | "notstarted" => Ok(BackgroundCheckStatus::NotStarted),
            "pending" => Ok(BackgroundCheckStatus::Pending),
            "approved" => Ok(BackgroundCheckStatus::Approved),
            "rejected" => Ok(BackgroundCheckStatus::Rejected),
            _ => Err(parse_error("background check status", s)),
        }
    }
}

/// Kind of in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskPosted,
    ApplicationReceived,
    ApplicationAccepted,
    ApplicationRejected,
    TaskAssigned,
    TaskCompleted,
    PaymentReceived,
    PaymentSent,
    ReviewReceived,
    MessageReceived,
}

impl NotificationType {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            NotificationType::TaskPosted => "task_posted",
            NotificationType::ApplicationReceived => "application_received",
            NotificationType::ApplicationAccepted => "application_accepted",
            NotificationType::ApplicationRejected => "application_rejected",
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskCompleted => "task_completed",
            NotificationType::PaymentReceived => "payment_received",
            NotificationType::PaymentSent => "payment_sent",
            NotificationType::ReviewReceived => "review_received",
            NotificationType::MessageReceived => "message_received",
        }
    }

    pub fn from_db_str(s: &str) -> Result<Self, EnumParseError> {
        match s.trim().to_lowercase().as_str() {
            "task_posted" => Ok(NotificationType::TaskPosted),
            "application_received" => Ok(NotificationType::ApplicationReceived),
            "application_accepted" => Ok(NotificationType::ApplicationAccepted),
            "application_rejected" => Ok(NotificationType::ApplicationRejected),
            "task_assigned" => Ok(NotificationType::TaskAssigned),
            "task_completed" => Ok(NotificationType::TaskCompleted),
            "payment_received" => Ok(NotificationType::PaymentReceived),
            "payment_sent" => Ok(NotificationType::PaymentSent),
            "review_received" => Ok(NotificationType::ReviewReceived),
            "message_received" => Ok(NotificationType::MessageReceived),
            _ => Err(parse_error("notification type", s)),
        }
    }
}

/// Entity type discriminator used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityType {
    User,
    Profile,
    HelperProfile,
    Task,
    Application,
    Message,
    Conversation,
    Review,
    Notification,
    Category,
}

// ============================================================================
// DISPLAY / FROMSTR
// ============================================================================

macro_rules! impl_db_str_traits {
    ($($ty:ty),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_db_str())
                }
            }

            impl FromStr for $ty {
                type Err = EnumParseError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::from_db_str(s)
                }
            }
        )*
    };
}

impl_db_str_traits!(
    UserRole,
    UserStatus,
    TaskStatus,
    ApplicationStatus,
    BudgetType,
    BackgroundCheckStatus,
    NotificationType,
);

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
