//! Read-side projections returned by listing and detail operations.

use crate::{
    Application, ConversationId, Message, Profile, Task, TaskId, TaskStatus, Timestamp, UserId,
    ValidationError,
};
use serde::{Deserialize, Serialize};

/// Public display info for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserSummary {
    pub user_id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
    pub rating: Option<f64>,
    pub review_count: u32,
}

impl UserSummary {
    /// Placeholder for a user whose profile is missing.
    pub fn unknown(user_id: UserId) -> Self {
        Self {
            user_id,
            name: "Unknown user".to_string(),
            avatar_url: None,
            rating: None,
            review_count: 0,
        }
    }
}

impl From<&Profile> for UserSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id,
            name: profile.name.clone(),
            avatar_url: profile.avatar_url.clone(),
            rating: profile.rating,
            review_count: profile.review_count,
        }
    }
}

/// A task with its applications and poster summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskDetails {
    pub task: Task,
    pub applications: Vec<Application>,
    pub poster: UserSummary,
}

/// A poster's task annotated with how many helpers applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskWithApplicationCount {
    pub task: Task,
    pub application_count: usize,
}

/// A helper's application together with the task it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApplicationWithTask {
    pub application: Application,
    pub task: Task,
}

/// One row of a task search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskSearchHit {
    pub task: Task,
    pub poster_name: String,
    pub poster_rating: Option<f64>,
    pub application_count: usize,
    pub distance_miles: Option<f64>,
}

/// Short task reference shown next to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TaskHeadline {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

impl From<&Task> for TaskHeadline {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
        }
    }
}

/// One entry of a user's inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub last_message: Message,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub last_message_at: Timestamp,
    pub message_count: usize,
    pub unread_count: usize,
    pub other_user: UserSummary,
    pub task: Option<TaskHeadline>,
}

/// Filters for the open-task search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema, utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct TaskQuery {
    pub search_term: Option<String>,
    pub category: Option<String>,
    /// Defaults to `open` when omitted.
    pub status: Option<TaskStatus>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub zip_code: Option<String>,
    pub radius_miles: Option<f64>,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl TaskQuery {
    /// Reject contradictory or non-finite filters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("min_budget", self.min_budget),
            ("max_budget", self.max_budget),
            ("radius_miles", self.radius_miles),
        ] {
            if let Some(v) = value {
                crate::validate_amount(field, v)?;
            }
        }
        if let (Some(min), Some(max)) = (self.min_budget, self.max_budget) {
            if min > max {
                return Err(ValidationError::ConstraintViolation {
                    constraint: "budget_range".to_string(),
                    reason: "min_budget must not exceed max_budget".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn effective_status(&self) -> TaskStatus {
        self.status.unwrap_or(TaskStatus::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_to_open() {
        assert_eq!(TaskQuery::default().effective_status(), TaskStatus::Open);
    }

    #[test]
    fn test_query_rejects_inverted_budget() {
        let query = TaskQuery {
            min_budget: Some(100.0),
            max_budget: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            query.validate(),
            Err(ValidationError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_query_rejects_negative_radius() {
        let query = TaskQuery {
            radius_miles: Some(-5.0),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }
}
