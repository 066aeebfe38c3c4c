//! Messaging REST API Routes
//!
//! Direct messages between two users, optionally scoped to a task, and the
//! conversation views derived from them.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use handy_core::{ConversationId, ConversationSummary, Message};
use handy_market::{Marketplace, NewMessage};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthExtractor,
    state::AppState,
    telemetry::track,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MessagePageParams {
    /// Page size; 0 or absent means the default.
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CountResponse {
    pub count: usize,
}

/// POST /api/v1/messages - Send a message
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "Messages",
    request_body = NewMessage,
    responses(
        (status = 201, description = "Message sent", body = Message),
        (status = 400, description = "Invalid message", body = ApiError),
        (status = 404, description = "Recipient or task not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<NewMessage>,
) -> ApiResult<impl IntoResponse> {
    let message = track("send_message", marketplace.messaging.send(&auth, req).await)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/v1/messages/unread-count
#[utoipa::path(
    get,
    path = "/api/v1/messages/unread-count",
    tag = "Messages",
    responses(
        (status = 200, description = "Unread messages addressed to the caller", body = CountResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn unread_count(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<CountResponse>> {
    track("unread_count", marketplace.messaging.unread_count(&auth).await)
        .map(|count| Json(CountResponse { count }))
}

/// GET /api/v1/conversations - Conversation summaries, most recent first
#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    tag = "Messages",
    responses(
        (status = 200, description = "Conversations the caller takes part in", body = Vec<ConversationSummary>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_conversations(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    track(
        "list_conversations",
        marketplace.messaging.list_conversations(&auth).await,
    )
    .map(Json)
}

/// GET /api/v1/conversations/{id}/messages - One page, oldest first
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    tag = "Messages",
    params(
        ("id" = String, Path, description = "Conversation ID"),
        MessagePageParams,
    ),
    responses(
        (status = 200, description = "Messages in creation order", body = Vec<Message>),
        (status = 403, description = "Caller is not a participant", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_messages(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<ConversationId>,
    Query(page): Query<MessagePageParams>,
) -> ApiResult<Json<Vec<Message>>> {
    track(
        "list_messages",
        marketplace
            .messaging
            .list_messages(
                &auth,
                &id,
                page.limit.unwrap_or(0),
                page.offset.unwrap_or(0),
            )
            .await,
    )
    .map(Json)
}

/// POST /api/v1/conversations/{id}/read - Mark the caller's messages read
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/read",
    tag = "Messages",
    params(("id" = String, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Number of messages newly marked read", body = CountResponse),
        (status = 403, description = "Caller is not a participant", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    State(marketplace): State<Marketplace>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<ConversationId>,
) -> ApiResult<Json<CountResponse>> {
    track("mark_read", marketplace.messaging.mark_read(&auth, &id).await)
        .map(|count| Json(CountResponse { count }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/unread-count", get(unread_count))
        .route("/conversations", get(list_conversations))
        .route("/conversations/:id/messages", get(list_messages))
        .route("/conversations/:id/read", post(mark_read))
}
