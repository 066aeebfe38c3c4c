//! Profile REST API Routes

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use handy_core::{HelperProfile, HelperProfileUpdate, Profile, ProfileUpdate, UserId};
use handy_market::{Marketplace, ProfileView};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    telemetry::track,
};

/// GET /api/v1/profiles/me
#[utoipa::path(
    get,
    path = "/api/v1/profiles/me",
    tag = "Profiles",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileView),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_my_profile(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<ProfileView>> {
    track(
        "get_profile",
        marketplace.profiles.get_profile(auth.user_id).await,
    )
    .map(Json)
}

/// PATCH /api/v1/profiles/me
#[utoipa::path(
    patch,
    path = "/api/v1/profiles/me",
    tag = "Profiles",
    request_body = ProfileUpdate,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Invalid profile fields", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_my_profile(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    track(
        "update_profile",
        marketplace.profiles.update_profile(&auth, update).await,
    )
    .map(Json)
}

/// PUT /api/v1/profiles/me/helper
#[utoipa::path(
    put,
    path = "/api/v1/profiles/me/helper",
    tag = "Profiles",
    request_body = HelperProfileUpdate,
    responses(
        (status = 200, description = "Saved helper profile", body = HelperProfile),
        (status = 400, description = "Invalid helper profile", body = ApiError),
        (status = 403, description = "Caller is not a helper", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn upsert_helper_profile(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Json(update): Json<HelperProfileUpdate>,
) -> ApiResult<Json<HelperProfile>> {
    track(
        "upsert_helper_profile",
        marketplace.profiles.upsert_helper_profile(&auth, update).await,
    )
    .map(Json)
}

/// GET /api/v1/profiles/{user_id}
#[utoipa::path(
    get,
    path = "/api/v1/profiles/{user_id}",
    tag = "Profiles",
    params(("user_id" = UserId, Path, description = "User ID")),
    responses(
        (status = 200, description = "Public profile", body = ProfileView),
        (status = 404, description = "Profile not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(marketplace): State<Marketplace>,
    AuthExtractor(_auth): AuthExtractor,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<ProfileView>> {
    track("get_profile", marketplace.profiles.get_profile(user_id).await).map(Json)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/profiles/me", get(get_my_profile).patch(update_my_profile))
        .route("/profiles/me/helper", put(upsert_helper_profile))
        .route("/profiles/:user_id", get(get_profile))
}
