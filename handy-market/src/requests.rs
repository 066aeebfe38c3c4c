//! Inputs accepted by the marketplace services.

use handy_core::{HelperProfile, Profile, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// A helper's bid on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewApplication {
    pub message: Option<String>,
    pub bid_amount: f64,
}

/// A message to another user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewMessage {
    pub recipient_id: UserId,
    pub content: String,
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// Feedback on the other participant of a completed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewReview {
    pub reviewee_id: UserId,
    pub rating: u8,
    pub comment: Option<String>,
}

/// A profile together with its helper extension, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProfileView {
    pub profile: Profile,
    pub helper_profile: Option<HelperProfile>,
}
