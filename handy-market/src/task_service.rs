//! Task Service
//!
//! Task creation, reads, and the status state machine. Moving a task into
//! `in-progress` is not done here; that only happens through
//! [`crate::MatchingService::accept`].

use std::sync::Arc;

use chrono::Utc;
use handy_core::{
    apply_status_change, EntityType, HandyResult, MarketConfig, NotificationType, StorageError,
    Task, TaskDetails, TaskDraft, TaskId, TaskQuery, TaskStatus, TaskWithApplicationCount,
    UserRole, UserSummary, WorkflowError,
};
use handy_events::{EventHub, MarketEvent};
use handy_storage::{MarketplaceStore, TaskSearch};
use serde_json::json;
use tracing::info;

use crate::{AuthContext, NotificationService, TaskPager};

#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn MarketplaceStore>,
    search: Arc<dyn TaskSearch>,
    events: EventHub,
    notifications: NotificationService,
    config: MarketConfig,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        search: Arc<dyn TaskSearch>,
        events: EventHub,
        notifications: NotificationService,
        config: MarketConfig,
    ) -> Self {
        Self {
            store,
            search,
            events,
            notifications,
            config,
        }
    }

    pub(crate) async fn load(&self, task_id: TaskId) -> HandyResult<Task> {
        self.store
            .task_get(task_id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Task, task_id).into())
    }

    /// Create an open task owned by the caller.
    pub async fn create_task(&self, ctx: &AuthContext, draft: TaskDraft) -> HandyResult<Task> {
        if !ctx.acts_as(UserRole::Poster) {
            return Err(WorkflowError::forbidden("post tasks", "only posters can post tasks").into());
        }
        let fields = draft.validate()?;
        let task = Task::new(ctx.user_id, fields, Utc::now());
        self.store.task_insert(&task).await?;

        info!(task_id = %task.id, actor_id = %ctx.user_id, "Task created");
        self.events
            .publish(MarketEvent::TaskCreated { task: task.clone() });
        Ok(task)
    }

    /// A task with its applications and poster summary.
    ///
    /// The poster (and admins) see every application; anyone else sees only
    /// their own.
    pub async fn get_task(&self, ctx: &AuthContext, task_id: TaskId) -> HandyResult<TaskDetails> {
        let task = self.load(task_id).await?;
        let mut applications = self.store.application_list_by_task(task_id).await?;
        if task.poster_id != ctx.user_id && !ctx.is_admin() {
            applications.retain(|a| a.helper_id == ctx.user_id);
        }
        let poster = match self.store.profile_get(task.poster_id).await? {
            Some(profile) => UserSummary::from(&profile),
            None => UserSummary::unknown(task.poster_id),
        };
        Ok(TaskDetails {
            task,
            applications,
            poster,
        })
    }

    /// The caller's own tasks, newest first.
    pub async fn list_for_poster(
        &self,
        ctx: &AuthContext,
        status: Option<TaskStatus>,
    ) -> HandyResult<Vec<TaskWithApplicationCount>> {
        self.store.task_list_by_poster(ctx.user_id, status).await
    }

    /// Pager over tasks matching `query`, starting at `query.offset`.
    pub fn list_open(&self, query: TaskQuery) -> HandyResult<TaskPager> {
        query.validate()?;
        let page_size = self.config.task_page_limit(query.limit);
        Ok(TaskPager::new(Arc::clone(&self.search), query, page_size))
    }

    /// Move a task along the lifecycle.
    ///
    /// The requested transition is checked first, then the caller's rights:
    /// completion follows the configured [`handy_core::CompletionPolicy`],
    /// every other change is reserved to the poster.
    pub async fn update_status(
        &self,
        ctx: &AuthContext,
        task_id: TaskId,
        next: TaskStatus,
    ) -> HandyResult<Task> {
        let task = self.load(task_id).await?;
        let current = task.status;
        let now = Utc::now();

        // Dry run on a copy: surfaces InvalidTransition / InvalidState before rights.
        apply_status_change(task.clone(), next, now)?;

        let allowed = match next {
            TaskStatus::Completed => self.config.completion_policy.allows(&task, ctx.user_id),
            _ => task.poster_id == ctx.user_id,
        };
        if !allowed && !ctx.is_admin() {
            return Err(WorkflowError::forbidden(
                format!("mark this task {}", next),
                "only the poster can change this task",
            )
            .into());
        }

        let outcome = self
            .store
            .task_transition(task_id, current, next, now)
            .await?;
        let updated = outcome.task;
        info!(
            task_id = %task_id,
            actor_id = %ctx.user_id,
            from = %current,
            to = %next,
            rejected = outcome.rejected.len(),
            "Task status changed"
        );
        self.events.publish(MarketEvent::TaskUpdated {
            task: updated.clone(),
        });

        for application in &outcome.rejected {
            self.events.publish(MarketEvent::ApplicationUpdated {
                application: application.clone(),
                poster_id: updated.poster_id,
            });
            self.notifications
                .notify(
                    application.helper_id,
                    NotificationType::ApplicationRejected,
                    "Application not selected",
                    &format!("\"{}\" is no longer open", updated.title),
                    json!({ "task_id": updated.id, "application_id": application.id }),
                )
                .await;
        }

        if next == TaskStatus::Completed {
            if let Some(helper_id) = updated.helper_id {
                self.notifications
                    .notify(
                        helper_id,
                        NotificationType::TaskCompleted,
                        "Task completed",
                        &format!("\"{}\" was marked completed", updated.title),
                        json!({ "task_id": updated.id }),
                    )
                    .await;
            }
        }
        Ok(updated)
    }

    pub async fn cancel_task(&self, ctx: &AuthContext, task_id: TaskId) -> HandyResult<Task> {
        self.update_status(ctx, task_id, TaskStatus::Cancelled).await
    }

    pub async fn complete_task(&self, ctx: &AuthContext, task_id: TaskId) -> HandyResult<Task> {
        self.update_status(ctx, task_id, TaskStatus::Completed).await
    }
}
