//! Notification REST API Routes

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use handy_core::{Notification, NotificationId};
use handy_market::Marketplace;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    telemetry::track,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

/// GET /api/v1/notifications
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    params(NotificationFilter),
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = Vec<Notification>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Query(filter): Query<NotificationFilter>,
) -> ApiResult<Json<Vec<Notification>>> {
    track(
        "list_notifications",
        marketplace.notifications.list(&auth, filter.unread_only).await,
    )
    .map(Json)
}

/// POST /api/v1/notifications/{id}/read
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = NotificationId, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 403, description = "Not the caller's notification", body = ApiError),
        (status = 404, description = "Notification not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<Notification>> {
    track(
        "mark_notification_read",
        marketplace.notifications.mark_read(&auth, id).await,
    )
    .map(Json)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/read", post(mark_notification_read))
}
