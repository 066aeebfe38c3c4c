//! Application REST API Routes
//!
//! Helpers apply to open tasks; the poster accepts one application, which
//! assigns the helper and rejects every other pending application at once.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use handy_core::{Application, ApplicationId, ApplicationStatus, ApplicationWithTask, Task, TaskId};
use handy_market::{Marketplace, NewApplication};
use handy_storage::AcceptOutcome;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    telemetry::track,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApplicationStatusFilter {
    pub status: Option<ApplicationStatus>,
}

/// Everything that changed when an application was accepted.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AcceptApplicationResponse {
    pub task: Task,
    pub application: Application,
    /// Sibling applications rejected by this accept.
    pub rejected: Vec<Application>,
}

impl From<AcceptOutcome> for AcceptApplicationResponse {
    fn from(outcome: AcceptOutcome) -> Self {
        Self {
            task: outcome.task,
            application: outcome.accepted,
            rejected: outcome.rejected,
        }
    }
}

/// POST /api/v1/tasks/{id}/applications - Apply to a task
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/applications",
    tag = "Applications",
    params(("id" = TaskId, Path, description = "Task ID")),
    request_body = NewApplication,
    responses(
        (status = 201, description = "Application submitted", body = Application),
        (status = 400, description = "Invalid bid", body = ApiError),
        (status = 403, description = "Caller cannot apply", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Task not open or already applied", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn apply_to_task(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<TaskId>,
    Json(req): Json<NewApplication>,
) -> ApiResult<impl IntoResponse> {
    let application = track(
        "apply_to_task",
        marketplace.matching.apply(&auth, id, req).await,
    )?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// GET /api/v1/applications/mine - The caller's applications
#[utoipa::path(
    get,
    path = "/api/v1/applications/mine",
    tag = "Applications",
    params(ApplicationStatusFilter),
    responses(
        (status = 200, description = "Applications with their tasks, newest first", body = Vec<ApplicationWithTask>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_applications(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Query(filter): Query<ApplicationStatusFilter>,
) -> ApiResult<Json<Vec<ApplicationWithTask>>> {
    track(
        "list_applications_for_helper",
        marketplace.matching.list_for_helper(&auth, filter.status).await,
    )
    .map(Json)
}

/// POST /api/v1/applications/{id}/accept
#[utoipa::path(
    post,
    path = "/api/v1/applications/{id}/accept",
    tag = "Applications",
    params(("id" = ApplicationId, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application accepted and helper assigned", body = AcceptApplicationResponse),
        (status = 403, description = "Only the poster can accept", body = ApiError),
        (status = 404, description = "Application not found", body = ApiError),
        (status = 409, description = "Task is no longer open", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn accept_application(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<AcceptApplicationResponse>> {
    track(
        "accept_application",
        marketplace.matching.accept(&auth, id).await,
    )
    .map(|outcome| Json(outcome.into()))
}

/// POST /api/v1/applications/{id}/reject
#[utoipa::path(
    post,
    path = "/api/v1/applications/{id}/reject",
    tag = "Applications",
    params(("id" = ApplicationId, Path, description = "Application ID")),
    responses(
        (status = 200, description = "Application rejected", body = Application),
        (status = 403, description = "Only the poster can reject", body = ApiError),
        (status = 409, description = "Application is not pending", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_application(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<ApplicationId>,
) -> ApiResult<Json<Application>> {
    track(
        "reject_application",
        marketplace.matching.reject(&auth, id).await,
    )
    .map(Json)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/tasks/:id/applications", post(apply_to_task))
        .route("/applications/mine", get(list_my_applications))
        .route("/applications/:id/accept", post(accept_application))
        .route("/applications/:id/reject", post(reject_application))
}
