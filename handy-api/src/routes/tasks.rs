//! Task REST API Routes
//!
//! Posting, browsing, and the task status lifecycle. Moving a task into
//! `in-progress` happens only through application acceptance.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use handy_core::{
    Task, TaskDetails, TaskDraft, TaskId, TaskQuery, TaskSearchHit, TaskStatus,
    TaskWithApplicationCount,
};
use handy_market::Marketplace;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    telemetry::track,
};

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskStatusFilter {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

/// One page of the open-task search.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TaskPage {
    pub items: Vec<TaskSearchHit>,
    pub offset: usize,
    pub limit: usize,
    /// Offset of the next page; absent on the last page.
    pub next_offset: Option<usize>,
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/v1/tasks - Post a new task
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    tag = "Tasks",
    request_body = TaskDraft,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid task", body = ApiError),
        (status = 403, description = "Caller cannot post tasks", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_task(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Json(draft): Json<TaskDraft>,
) -> ApiResult<impl IntoResponse> {
    let task = track("create_task", marketplace.tasks.create_task(&auth, draft).await)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /api/v1/tasks - Search tasks (open by default)
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "Tasks",
    params(TaskQuery),
    responses(
        (status = 200, description = "One page of matching tasks", body = TaskPage),
        (status = 400, description = "Invalid filters", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tasks(
    State(marketplace): State<Marketplace>,
    AuthExtractor(_auth): AuthExtractor,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<TaskPage>> {
    let result = async {
        let mut pager = marketplace.tasks.list_open(query)?;
        let offset = pager.offset();
        let limit = pager.page_size();
        let items = pager.next_page().await?;
        let next_offset = (!pager.is_exhausted()).then(|| pager.offset());
        Ok::<_, handy_core::HandyError>(TaskPage {
            items,
            offset,
            limit,
            next_offset,
        })
    }
    .await;
    track("list_open_tasks", result).map(Json)
}

/// GET /api/v1/tasks/mine - The caller's posted tasks
#[utoipa::path(
    get,
    path = "/api/v1/tasks/mine",
    tag = "Tasks",
    params(TaskStatusFilter),
    responses(
        (status = 200, description = "Tasks posted by the caller, newest first", body = Vec<TaskWithApplicationCount>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_my_tasks(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Query(filter): Query<TaskStatusFilter>,
) -> ApiResult<Json<Vec<TaskWithApplicationCount>>> {
    track(
        "list_tasks_for_poster",
        marketplace.tasks.list_for_poster(&auth, filter.status).await,
    )
    .map(Json)
}

/// GET /api/v1/tasks/{id} - Task with applications and poster
#[utoipa::path(
    get,
    path = "/api/v1/tasks/{id}",
    tag = "Tasks",
    params(("id" = TaskId, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task details", body = TaskDetails),
        (status = 404, description = "Task not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_task(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<TaskId>,
) -> ApiResult<Json<TaskDetails>> {
    track("get_task", marketplace.tasks.get_task(&auth, id).await).map(Json)
}

/// PATCH /api/v1/tasks/{id}/status - Move a task along its lifecycle
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}/status",
    tag = "Tasks",
    params(("id" = TaskId, Path, description = "Task ID")),
    request_body = UpdateTaskStatusRequest,
    responses(
        (status = 200, description = "Updated task", body = Task),
        (status = 403, description = "Caller may not make this change", body = ApiError),
        (status = 404, description = "Task not found", body = ApiError),
        (status = 409, description = "Transition not allowed", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_task_status(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTaskStatusRequest>,
) -> ApiResult<Json<Task>> {
    track(
        "update_task_status",
        marketplace.tasks.update_status(&auth, id, req.status).await,
    )
    .map(Json)
}

/// POST /api/v1/tasks/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/cancel",
    tag = "Tasks",
    params(("id" = TaskId, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Cancelled task", body = Task),
        (status = 403, description = "Only the poster can cancel", body = ApiError),
        (status = 409, description = "Task already finished", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn cancel_task(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<TaskId>,
) -> ApiResult<Json<Task>> {
    track("cancel_task", marketplace.tasks.cancel_task(&auth, id).await).map(Json)
}

/// POST /api/v1/tasks/{id}/complete
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/complete",
    tag = "Tasks",
    params(("id" = TaskId, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Completed task", body = Task),
        (status = 403, description = "Caller may not complete this task", body = ApiError),
        (status = 409, description = "Task is not in progress", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn complete_task(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<TaskId>,
) -> ApiResult<Json<Task>> {
    track("complete_task", marketplace.tasks.complete_task(&auth, id).await).map(Json)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/tasks", post(create_task).get(list_tasks))
        .route("/tasks/mine", get(list_my_tasks))
        .route("/tasks/:id", get(get_task))
        .route("/tasks/:id/status", patch(update_task_status))
        .route("/tasks/:id/cancel", post(cancel_task))
        .route("/tasks/:id/complete", post(complete_task))
}
