//! Matching Service
//!
//! Application lifecycle: apply, accept, reject. Accept is delegated to a
//! single atomic store operation that also assigns the helper and rejects
//! every pending sibling.

use std::sync::Arc;

use chrono::Utc;
use handy_core::{
    Application, ApplicationId, ApplicationStatus, ApplicationWithTask, EntityType, HandyResult,
    NotificationType, StorageError, Task, TaskId, TaskStatus, UserRole, WorkflowError,
};
use handy_events::{EventHub, MarketEvent};
use handy_storage::{AcceptOutcome, MarketplaceStore};
use serde_json::json;
use tracing::info;

use crate::{AuthContext, NewApplication, NotificationService};

#[derive(Clone)]
pub struct MatchingService {
    store: Arc<dyn MarketplaceStore>,
    events: EventHub,
    notifications: NotificationService,
}

impl MatchingService {
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

    async fn load_task(&self, task_id: TaskId) -> HandyResult<Task> {
        self.store
            .task_get(task_id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Task, task_id).into())
    }

    async fn load_application(&self, id: ApplicationId) -> HandyResult<Application> {
        self.store
            .application_get(id)
            .await?
            .ok_or_else(|| StorageError::not_found(EntityType::Application, id).into())
    }

    /// Apply to an open task as the calling helper.
    pub async fn apply(
        &self,
        ctx: &AuthContext,
        task_id: TaskId,
        request: NewApplication,
    ) -> HandyResult<Application> {
        if !ctx.acts_as(UserRole::Helper) {
            return Err(
                WorkflowError::forbidden("apply to tasks", "only helpers can apply").into(),
            );
        }
        let task = self.load_task(task_id).await?;
        if task.poster_id == ctx.user_id {
            return Err(WorkflowError::forbidden(
                "apply to this task",
                "posters cannot apply to their own task",
            )
            .into());
        }

        let application = Application::new(
            task_id,
            ctx.user_id,
            request.message,
            request.bid_amount,
            Utc::now(),
        )?;
        self.store.application_insert(&application).await?;

        info!(
            task_id = %task_id,
            application_id = %application.id,
            actor_id = %ctx.user_id,
            bid_amount = application.bid_amount,
            "Application submitted"
        );
        self.events.publish(MarketEvent::ApplicationCreated {
            application: application.clone(),
            poster_id: task.poster_id,
        });
        self.notifications
            .notify(
                task.poster_id,
                NotificationType::ApplicationReceived,
                "New application",
                &format!("A helper applied to \"{}\"", task.title),
                json!({ "task_id": task_id, "application_id": application.id }),
            )
            .await;
        Ok(application)
    }

    /// Accept one application on the caller's task.
    ///
    /// The application becomes accepted, every pending sibling rejected, and
    /// the task in progress with that helper, as one unit. A second accept on
    /// the same task fails with `InvalidState` and changes nothing.
    pub async fn accept(
        &self,
        ctx: &AuthContext,
        application_id: ApplicationId,
    ) -> HandyResult<AcceptOutcome> {
        let application = self.load_application(application_id).await?;
        let task = self.load_task(application.task_id).await?;

        if task.status != TaskStatus::Open {
            return Err(
                WorkflowError::task_state(task.id, "This task is no longer open").into(),
            );
        }
        if task.poster_id != ctx.user_id && !ctx.is_admin() {
            return Err(WorkflowError::forbidden(
                "accept this application",
                "only the task poster can accept applications",
            )
            .into());
        }

        // Re-checks status atomically; a concurrent accept loses here.
        let outcome = self
            .store
            .application_accept(application_id, Utc::now())
            .await?;

        info!(
            task_id = %outcome.task.id,
            application_id = %application_id,
            actor_id = %ctx.user_id,
            helper_id = %outcome.accepted.helper_id,
            rejected = outcome.rejected.len(),
            "Application accepted"
        );

        self.events.publish(MarketEvent::TaskUpdated {
            task: outcome.task.clone(),
        });
        for app in std::iter::once(&outcome.accepted).chain(outcome.rejected.iter()) {
            self.events.publish(MarketEvent::ApplicationUpdated {
                application: app.clone(),
                poster_id: outcome.task.poster_id,
            });
        }

        let data = json!({ "task_id": outcome.task.id });
        self.notifications
            .notify(
                outcome.accepted.helper_id,
                NotificationType::ApplicationAccepted,
                "Application accepted",
                &format!("Your application for \"{}\" was accepted", outcome.task.title),
                data.clone(),
            )
            .await;
        self.notifications
            .notify(
                outcome.accepted.helper_id,
                NotificationType::TaskAssigned,
                "Task assigned",
                &format!("You are now assigned to \"{}\"", outcome.task.title),
                data,
            )
            .await;
        for rejected in &outcome.rejected {
            self.notify_rejected(rejected, &outcome.task).await;
        }
        Ok(outcome)
    }

    /// Reject one pending application on the caller's task. The task is untouched.
    pub async fn reject(
        &self,
        ctx: &AuthContext,
        application_id: ApplicationId,
    ) -> HandyResult<Application> {
        let application = self.load_application(application_id).await?;
        let task = self.load_task(application.task_id).await?;

        if application.status != ApplicationStatus::Pending {
            return Err(WorkflowError::application_state(
                application_id,
                format!("This application was already {}", application.status),
            )
            .into());
        }
        if task.poster_id != ctx.user_id && !ctx.is_admin() {
            return Err(WorkflowError::forbidden(
                "reject this application",
                "only the task poster can reject applications",
            )
            .into());
        }

        let rejected = self
            .store
            .application_reject(application_id, Utc::now())
            .await?;
        info!(
            task_id = %task.id,
            application_id = %application_id,
            actor_id = %ctx.user_id,
            "Application rejected"
        );
        self.events.publish(MarketEvent::ApplicationUpdated {
            application: rejected.clone(),
            poster_id: task.poster_id,
        });
        self.notify_rejected(&rejected, &task).await;
        Ok(rejected)
    }

    /// The caller's applications with their tasks, newest first.
    pub async fn list_for_helper(
        &self,
        ctx: &AuthContext,
        status: Option<ApplicationStatus>,
    ) -> HandyResult<Vec<ApplicationWithTask>> {
        self.store
            .application_list_by_helper(ctx.user_id, status)
            .await
    }

    async fn notify_rejected(&self, application: &Application, task: &Task) {
        self.notifications
            .notify(
                application.helper_id,
                NotificationType::ApplicationRejected,
                "Application not selected",
                &format!("Your application for \"{}\" was not selected", task.title),
                json!({ "task_id": task.id, "application_id": application.id }),
            )
            .await;
    }
}
