//! Review Service
//!
//! Reviews are left by one participant of a completed task about the other.
//! The reviewee's cached rating is recomputed from every review they have
//! received, in the same store operation that inserts the review.

use std::sync::Arc;

use chrono::Utc;
use handy_core::{
    EntityType, HandyResult, NotificationType, Review, StorageError, TaskId, TaskStatus, UserId,
    WorkflowError,
};
use handy_events::{EventHub, MarketEvent};
use handy_storage::MarketplaceStore;
use serde_json::json;
use tracing::info;

use crate::{AuthContext, NewReview, NotificationService};

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<dyn MarketplaceStore>,
    events: EventHub,
    notifications: NotificationService,
}

impl ReviewService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        events: EventHub,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            events,
            notifications,
        }
    }

    /// Review the other participant of a completed task.
    pub async fn add_review(
        &self,
        ctx: &AuthContext,
        task_id: TaskId,
        request: NewReview,
    ) -> HandyResult<Review> {
        let task = self
            .store
            .task_get(task_id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Task, task_id))?;

        if task.status != TaskStatus::Completed {
            return Err(WorkflowError::task_state(
                task_id,
                "Reviews can only be left on completed tasks",
            )
            .into());
        }
        if !task.is_participant(ctx.user_id) {
            return Err(WorkflowError::task_state(
                task_id,
                "Only the poster and the assigned helper can review this task",
            )
            .into());
        }
        if task.counterpart_of(ctx.user_id) != Some(request.reviewee_id) {
            return Err(WorkflowError::task_state(
                task_id,
                "You can only review the other participant of this task",
            )
            .into());
        }

        let review = Review::new(
            task_id,
            ctx.user_id,
            request.reviewee_id,
            request.rating,
            request.comment,
            Utc::now(),
        )?;
        let profile = self.store.review_insert(&review).await?;

        info!(
            task_id = %task_id,
            review_id = %review.id,
            actor_id = %ctx.user_id,
            reviewee_id = %review.reviewee_id,
            rating = review.rating,
            new_average = ?profile.rating,
            review_count = profile.review_count,
            "Review created"
        );
        self.events.publish(MarketEvent::ReviewCreated {
            review: review.clone(),
        });
        self.notifications
            .notify(
                review.reviewee_id,
                NotificationType::ReviewReceived,
                "New review",
                &format!("You received a {}-star review for \"{}\"", review.rating, task.title),
                json!({ "task_id": task_id, "review_id": review.id }),
            )
            .await;
        Ok(review)
    }

    /// Reviews a user has received, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> HandyResult<Vec<Review>> {
        self.store.review_list_for_user(user_id).await
    }
}
