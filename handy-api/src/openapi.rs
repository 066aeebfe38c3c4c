//! OpenAPI Specification for the Handy API
//!
//! Generated by utoipa from the route annotations and domain types.
//! Served at `/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{
    applications, categories, health, messages, notifications, profiles, reviews, tasks,
};
use crate::telemetry::metrics;
use crate::ws;

use handy_core::{
    Address, Application, ApplicationStatus, ApplicationWithTask, BackgroundCheckStatus, Budget,
    BudgetType, ConversationSummary, HelperProfile, HelperProfileUpdate, Location, Message,
    Notification, NotificationType, Profile, ProfileUpdate, Review, Task, TaskCategory,
    TaskDetails, TaskDraft, TaskHeadline, TaskSearchHit, TaskStatus, TaskWithApplicationCount,
    UserRole, UserSummary,
};
use handy_market::{NewApplication, NewMessage, NewReview, ProfileView};

/// OpenAPI document for the Handy API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Handy API",
        version = "0.1.0",
        description = "Local-services marketplace: tasks, applications, messaging and reviews",
        license(name = "MIT"),
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    tags(
        (name = "Tasks", description = "Posting, searching and the task lifecycle"),
        (name = "Applications", description = "Applying, accepting and rejecting"),
        (name = "Messages", description = "Direct messages and conversations"),
        (name = "Reviews", description = "Post-completion reviews"),
        (name = "Profiles", description = "User and helper profiles"),
        (name = "Categories", description = "Task categories"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Realtime", description = "WebSocket topic subscriptions"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        tasks::create_task,
        tasks::list_tasks,
        tasks::list_my_tasks,
        tasks::get_task,
        tasks::update_task_status,
        tasks::cancel_task,
        tasks::complete_task,
        applications::apply_to_task,
        applications::list_my_applications,
        applications::accept_application,
        applications::reject_application,
        messages::send_message,
        messages::unread_count,
        messages::list_conversations,
        messages::list_messages,
        messages::mark_read,
        reviews::add_review,
        reviews::list_reviews_for_user,
        profiles::get_my_profile,
        profiles::update_my_profile,
        profiles::upsert_helper_profile,
        profiles::get_profile,
        categories::list_categories,
        notifications::list_notifications,
        notifications::mark_notification_read,
        ws::ws_handler,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        Task,
        TaskDraft,
        TaskStatus,
        TaskDetails,
        TaskHeadline,
        TaskSearchHit,
        TaskWithApplicationCount,
        Budget,
        BudgetType,
        Location,
        Address,
        Application,
        ApplicationStatus,
        ApplicationWithTask,
        Message,
        ConversationSummary,
        Review,
        Profile,
        ProfileUpdate,
        HelperProfile,
        HelperProfileUpdate,
        BackgroundCheckStatus,
        Notification,
        NotificationType,
        TaskCategory,
        UserRole,
        UserSummary,
        NewApplication,
        NewMessage,
        NewReview,
        ProfileView,
        tasks::UpdateTaskStatusRequest,
        tasks::TaskPage,
        applications::AcceptApplicationResponse,
        messages::CountResponse,
        health::HealthResponse,
        health::HealthStatus,
        health::HealthDetails,
        health::ComponentHealth,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by every `/api/v1` path.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token issued by the identity gateway"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Handy API");

        for path in [
            "/api/v1/tasks",
            "/api/v1/tasks/{id}/status",
            "/api/v1/applications/{id}/accept",
            "/api/v1/conversations/{id}/messages",
            "/health/ready",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing path {}", path);
        }

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "components missing".to_string())?;
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("Task"));
        Ok(())
    }

    #[test]
    fn test_openapi_json_roundtrips() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| e.to_string())?;
        let value: serde_json::Value = serde_json::from_str(&json).map_err(|e| e.to_string())?;
        assert_eq!(value["info"]["title"], "Handy API");
        Ok(())
    }
}
