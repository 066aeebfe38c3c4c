//! REST client for the Handy API.

use std::time::Duration;

use handy_api::error::ApiError;
use handy_api::routes::applications::AcceptApplicationResponse;
use handy_api::routes::messages::CountResponse;
use handy_api::routes::tasks::{TaskPage, UpdateTaskStatusRequest};
use handy_core::{
    Application, ApplicationId, ApplicationStatus, ApplicationWithTask, ConversationId,
    ConversationSummary, HelperProfile, HelperProfileUpdate, Message, Notification,
    NotificationId, Profile, ProfileUpdate, Review, Task, TaskCategory, TaskDetails, TaskDraft,
    TaskId, TaskQuery, TaskStatus, TaskWithApplicationCount, UserId,
};
use handy_market::{NewApplication, NewMessage, NewReview, ProfileView};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{BackoffConfig, ClientConfig};
use crate::Session;

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// Transport failure: connect, timeout, or a broken body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with its error envelope.
    #[error("API error ({status}): {error}")]
    Api { status: u16, error: ApiError },
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Not logged in")]
    NotLoggedIn,
}

impl From<tokio_tungstenite::tungstenite::Error> for ApiClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl ApiClientError {
    /// The server-side error code, when the server produced one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Api { status, .. } => *status == StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    session: Session,
    max_retries: u32,
    retry: BackoffConfig,
}

impl RestClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ApiClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
            max_retries: config.max_retries,
            retry: config.retry.clone(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Fetch the caller's profile and remember whose token this is.
    pub async fn whoami(&self) -> Result<ProfileView, ApiClientError> {
        let view: ProfileView = self.get_json("/api/v1/profiles/me", None::<&()>).await?;
        self.session.bind_user(view.profile.user_id);
        Ok(view)
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<Task, ApiClientError> {
        self.send_json(Method::POST, "/api/v1/tasks", draft).await
    }

    pub async fn search_tasks(&self, query: &TaskQuery) -> Result<TaskPage, ApiClientError> {
        self.get_json("/api/v1/tasks", Some(query)).await
    }

    pub async fn my_tasks(
        &self,
        status: Option<TaskStatus>,
    ) -> Result<Vec<TaskWithApplicationCount>, ApiClientError> {
        let query = status.map(|s| [("status", s.to_string())]);
        self.get_json("/api/v1/tasks/mine", query.as_ref()).await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<TaskDetails, ApiClientError> {
        self.get_json(&format!("/api/v1/tasks/{}", id), None::<&()>)
            .await
    }

    pub async fn update_task_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, ApiClientError> {
        self.send_json(
            Method::PATCH,
            &format!("/api/v1/tasks/{}/status", id),
            &UpdateTaskStatusRequest { status },
        )
        .await
    }

    pub async fn cancel_task(&self, id: TaskId) -> Result<Task, ApiClientError> {
        self.post_empty(&format!("/api/v1/tasks/{}/cancel", id)).await
    }

    pub async fn complete_task(&self, id: TaskId) -> Result<Task, ApiClientError> {
        self.post_empty(&format!("/api/v1/tasks/{}/complete", id))
            .await
    }

    // ------------------------------------------------------------------
    // Applications
    // ------------------------------------------------------------------

    pub async fn apply(
        &self,
        task_id: TaskId,
        application: &NewApplication,
    ) -> Result<Application, ApiClientError> {
        self.send_json(
            Method::POST,
            &format!("/api/v1/tasks/{}/applications", task_id),
            application,
        )
        .await
    }

    pub async fn accept_application(
        &self,
        id: ApplicationId,
    ) -> Result<AcceptApplicationResponse, ApiClientError> {
        self.post_empty(&format!("/api/v1/applications/{}/accept", id))
            .await
    }

    pub async fn reject_application(&self, id: ApplicationId) -> Result<Application, ApiClientError> {
        self.post_empty(&format!("/api/v1/applications/{}/reject", id))
            .await
    }

    pub async fn my_applications(
        &self,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationWithTask>, ApiClientError> {
        let query = status.map(|s| [("status", s.to_string())]);
        self.get_json("/api/v1/applications/mine", query.as_ref())
            .await
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    pub async fn send_message(&self, message: &NewMessage) -> Result<Message, ApiClientError> {
        self.send_json(Method::POST, "/api/v1/messages", message)
            .await
    }

    pub async fn conversations(&self) -> Result<Vec<ConversationSummary>, ApiClientError> {
        self.get_json("/api/v1/conversations", None::<&()>).await
    }

    pub async fn messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, ApiClientError> {
        self.get_json(
            &format!("/api/v1/conversations/{}/messages", conversation),
            Some(&[("limit", limit), ("offset", offset)]),
        )
        .await
    }

    /// Returns how many messages were newly marked read.
    pub async fn mark_conversation_read(
        &self,
        conversation: &ConversationId,
    ) -> Result<usize, ApiClientError> {
        let count: CountResponse = self
            .post_empty(&format!("/api/v1/conversations/{}/read", conversation))
            .await?;
        Ok(count.count)
    }

    pub async fn unread_count(&self) -> Result<usize, ApiClientError> {
        let count: CountResponse = self
            .get_json("/api/v1/messages/unread-count", None::<&()>)
            .await?;
        Ok(count.count)
    }

    // ------------------------------------------------------------------
    // Reviews, profiles, categories, notifications
    // ------------------------------------------------------------------

    pub async fn add_review(
        &self,
        task_id: TaskId,
        review: &NewReview,
    ) -> Result<Review, ApiClientError> {
        self.send_json(
            Method::POST,
            &format!("/api/v1/tasks/{}/reviews", task_id),
            review,
        )
        .await
    }

    pub async fn reviews_for(&self, user_id: UserId) -> Result<Vec<Review>, ApiClientError> {
        self.get_json(&format!("/api/v1/users/{}/reviews", user_id), None::<&()>)
            .await
    }

    pub async fn profile(&self, user_id: UserId) -> Result<ProfileView, ApiClientError> {
        self.get_json(&format!("/api/v1/profiles/{}", user_id), None::<&()>)
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiClientError> {
        self.send_json(Method::PATCH, "/api/v1/profiles/me", update)
            .await
    }

    pub async fn upsert_helper_profile(
        &self,
        update: &HelperProfileUpdate,
    ) -> Result<HelperProfile, ApiClientError> {
        self.send_json(Method::PUT, "/api/v1/profiles/me/helper", update)
            .await
    }

    pub async fn categories(&self) -> Result<Vec<TaskCategory>, ApiClientError> {
        self.get_json("/api/v1/categories", None::<&()>).await
    }

    pub async fn notifications(
        &self,
        unread_only: bool,
    ) -> Result<Vec<Notification>, ApiClientError> {
        self.get_json(
            "/api/v1/notifications",
            Some(&[("unread_only", unread_only)]),
        )
        .await
    }

    pub async fn mark_notification_read(
        &self,
        id: NotificationId,
    ) -> Result<Notification, ApiClientError> {
        self.post_empty(&format!("/api/v1/notifications/{}/read", id))
            .await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiClientError> {
        let bearer = self.session.bearer().ok_or(ApiClientError::NotLoggedIn)?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, url).header(AUTHORIZATION, bearer))
    }

    /// GET with retries on network failures.
    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut attempt = 0;
        loop {
            let mut request = self.request(Method::GET, path)?;
            if let Some(query) = query {
                request = request.query(query);
            }
            let result = match request.send().await {
                Ok(response) => parse_response(response).await,
                Err(e) => Err(ApiClientError::from(e)),
            };
            match result {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = jittered_backoff(self.retry.delay_ms(attempt), self.retry.jitter_ms);
                    warn!(path, attempt, delay_ms = delay, error = %e, "Retrying request");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(%method, path, "Sending request");
        let response = self.request(method, path)?.json(body).send().await?;
        parse_response(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiClientError> {
        self.send_json(Method::POST, path, &serde_json::json!({}))
            .await
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }
    let text = response.text().await?;
    match serde_json::from_str::<ApiError>(&text) {
        Ok(error) => Err(ApiClientError::Api {
            status: status.as_u16(),
            error,
        }),
        Err(_) => Err(ApiClientError::InvalidResponse(format!(
            "HTTP {}: {}",
            status.as_u16(),
            text
        ))),
    }
}

pub(crate) fn jittered_backoff(base_ms: u64, jitter_ms: u64) -> u64 {
    if jitter_ms == 0 {
        return base_ms;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_nanos(0))
        .subsec_nanos() as u64;
    base_ms.saturating_add(nanos % jitter_ms)
}
