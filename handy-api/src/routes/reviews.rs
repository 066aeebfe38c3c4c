//! Review REST API Routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use handy_core::{Review, TaskId, UserId};
use handy_market::{Marketplace, NewReview};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    telemetry::track,
};

/// POST /api/v1/tasks/{id}/reviews - Review the other participant
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/reviews",
    tag = "Reviews",
    params(("id" = TaskId, Path, description = "Task ID")),
    request_body = NewReview,
    responses(
        (status = 201, description = "Review created; the reviewee's rating is updated", body = Review),
        (status = 400, description = "Rating out of range", body = ApiError),
        (status = 409, description = "Task not completed, wrong reviewee, or already reviewed", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn add_review(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<TaskId>,
    Json(req): Json<NewReview>,
) -> ApiResult<impl IntoResponse> {
    let review = track("add_review", marketplace.reviews.add_review(&auth, id, req).await)?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/v1/users/{id}/reviews - Reviews a user has received
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/reviews",
    tag = "Reviews",
    params(("id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<Review>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_reviews_for_user(
    State(marketplace): State<Marketplace>,
    AuthExtractor(_auth): AuthExtractor,
    Path(id): Path<UserId>,
) -> ApiResult<Json<Vec<Review>>> {
    track(
        "list_reviews_for_user",
        marketplace.reviews.list_for_user(id).await,
    )
    .map(Json)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/tasks/:id/reviews", post(add_review))
        .route("/users/:id/reviews", get(list_reviews_for_user))
}
