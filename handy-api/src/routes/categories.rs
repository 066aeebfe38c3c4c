//! Category REST API Routes

use axum::{extract::State, routing::get, Json, Router};
use handy_core::TaskCategory;
use handy_market::Marketplace;

use crate::{error::ApiResult, middleware::AuthExtractor, state::AppState, telemetry::track};

/// GET /api/v1/categories - Active categories in display order
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "Active task categories", body = Vec<TaskCategory>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_categories(
    State(marketplace): State<Marketplace>,
    AuthExtractor(_auth): AuthExtractor,
) -> ApiResult<Json<Vec<TaskCategory>>> {
    track("list_categories", marketplace.categories.list().await).map(Json)
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}
