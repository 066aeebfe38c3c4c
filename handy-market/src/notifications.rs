//! Notification Service
//!
//! In-app notifications are a side channel: creating one never fails the
//! operation that triggered it.

use std::sync::Arc;

use chrono::Utc;
use handy_core::{
    HandyResult, Notification, NotificationId, NotificationType, StorageError, EntityType,
    UserId, WorkflowError,
};
use handy_events::{EventHub, MarketEvent};
use handy_storage::MarketplaceStore;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::AuthContext;

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn MarketplaceStore>,
    events: EventHub,
}

impl NotificationService {
    pub fn new(store: Arc<dyn MarketplaceStore>, events: EventHub) -> Self {
        Self { store, events }
    }

    /// Record and publish a notification. Failures are logged and swallowed.
    pub async fn notify(
        &self,
        user_id: UserId,
        notification_type: NotificationType,
        title: &str,
        message: &str,
        data: JsonValue,
    ) {
        let notification =
            Notification::new(user_id, notification_type, title, message, data, Utc::now());
        match self.store.notification_insert(&notification).await {
            Ok(()) => {
                debug!(
                    user_id = %user_id,
                    notification_type = %notification_type,
                    "Notification created"
                );
                self.events
                    .publish(MarketEvent::NotificationCreated { notification });
            }
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    notification_type = %notification_type,
                    error = %e,
                    "Failed to create notification"
                );
            }
        }
    }

    /// The caller's notifications, newest first.
    pub async fn list(&self, ctx: &AuthContext, unread_only: bool) -> HandyResult<Vec<Notification>> {
        self.store.notification_list(ctx.user_id, unread_only).await
    }

    /// Mark one of the caller's notifications read. Idempotent.
    pub async fn mark_read(&self, ctx: &AuthContext, id: NotificationId) -> HandyResult<Notification> {
        let notification = self
            .store
            .notification_get(id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Notification, id))?;
        if notification.user_id != ctx.user_id {
            return Err(WorkflowError::forbidden(
                "read this notification",
                "it belongs to another user",
            )
            .into());
        }
        self.store.notification_mark_read(id, Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handy_core::{ErrorKind, UserRole};
    use handy_storage::InMemoryStore;
    use serde_json::json;

    fn service() -> NotificationService {
        NotificationService::new(Arc::new(InMemoryStore::new()), EventHub::new(16))
    }

    #[tokio::test]
    async fn test_notify_then_mark_read() {
        let svc = service();
        let ctx = AuthContext::new(UserId::now_v7(), "p@example.com", UserRole::Poster);
        svc.notify(
            ctx.user_id,
            NotificationType::ApplicationReceived,
            "New application",
            "Someone applied",
            json!({}),
        )
        .await;

        let unread = svc.list(&ctx, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        let read = svc.mark_read(&ctx, unread[0].id).await.unwrap();
        assert!(read.read_at.is_some());
        // Second call keeps the original timestamp.
        let again = svc.mark_read(&ctx, unread[0].id).await.unwrap();
        assert_eq!(again.read_at, read.read_at);
        assert!(svc.list(&ctx, true).await.unwrap().is_empty());
        assert_eq!(svc.list(&ctx, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_other_user_forbidden() {
        let svc = service();
        let owner = UserId::now_v7();
        svc.notify(owner, NotificationType::TaskCompleted, "Done", "Task done", json!({}))
            .await;
        let owner_ctx = AuthContext::new(owner, "o@example.com", UserRole::Helper);
        let id = svc.list(&owner_ctx, false).await.unwrap()[0].id;

        let intruder = AuthContext::new(UserId::now_v7(), "x@example.com", UserRole::Helper);
        let err = svc.mark_read(&intruder, id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
