//! In-memory marketplace store.
//!
//! All collections sit behind one `RwLock`, so every trait method runs as a
//! single atomic unit. Cross-row operations (accept, review) hold the write
//! lock for their whole read-check-write sequence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ::async_trait::async_trait;
use handy_core::{
    default_categories, Application, ApplicationId, ApplicationStatus, ApplicationWithTask,
    ConversationId, EntityType, HandyError, HandyResult, HelperProfile, HelperProfileUpdate,
    Message, Notification, NotificationId, Profile, ProfileUpdate, RatingAggregate, Review,
    StorageError, Task, TaskCategory, TaskId, TaskStatus, TaskWithApplicationCount, Timestamp,
    User, UserId, WorkflowError,
};

use crate::store::{AcceptOutcome, MarketplaceStore, TransitionOutcome};

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) profiles: HashMap<UserId, Profile>,
    pub(crate) helper_profiles: HashMap<UserId, HelperProfile>,
    pub(crate) tasks: HashMap<TaskId, Task>,
    pub(crate) applications: HashMap<ApplicationId, Application>,
    /// Append-only, in creation order.
    pub(crate) messages: Vec<Message>,
    pub(crate) reviews: Vec<Review>,
    pub(crate) notifications: HashMap<NotificationId, Notification>,
    pub(crate) categories: Vec<TaskCategory>,
}

impl Tables {
    pub(crate) fn application_count(&self, task_id: TaskId) -> usize {
        self.applications
            .values()
            .filter(|a| a.task_id == task_id)
            .count()
    }
}

/// Thread-safe in-memory store. Cloning shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// A store seeded with the default task categories.
    pub fn new() -> Self {
        let tables = Tables {
            categories: default_categories(),
            ..Tables::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// A store with no rows at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn read(&self) -> HandyResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| HandyError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> HandyResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| HandyError::Storage(StorageError::LockPoisoned))
    }
}

fn not_found(entity_type: EntityType, id: impl ToString) -> HandyError {
    HandyError::Storage(StorageError::not_found(entity_type, id))
}

/// Sort by a (timestamp, id) key, newest first. UUIDv7 ids break timestamp ties.
fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    // === User / Profile Operations ===

    async fn user_upsert(&self, user: &User) -> HandyResult<User> {
        let mut tables = self.write()?;
        Ok(tables
            .users
            .entry(user.id)
            .or_insert_with(|| user.clone())
            .clone())
    }

    async fn user_get(&self, id: UserId) -> HandyResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn profile_insert_if_absent(&self, profile: &Profile) -> HandyResult<Profile> {
        let mut tables = self.write()?;
        Ok(tables
            .profiles
            .entry(profile.user_id)
            .or_insert_with(|| profile.clone())
            .clone())
    }

    async fn profile_get(&self, user_id: UserId) -> HandyResult<Option<Profile>> {
        Ok(self.read()?.profiles.get(&user_id).cloned())
    }

    async fn profile_update(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
        at: Timestamp,
    ) -> HandyResult<Profile> {
        let mut tables = self.write()?;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or_else(|| not_found(EntityType::Profile, user_id))?;
        let mut updated = profile.clone();
        updated.apply(update, at)?;
        *profile = updated.clone();
        Ok(updated)
    }

    async fn helper_profile_get(&self, user_id: UserId) -> HandyResult<Option<HelperProfile>> {
        Ok(self.read()?.helper_profiles.get(&user_id).cloned())
    }

    async fn helper_profile_upsert(
        &self,
        user_id: UserId,
        update: HelperProfileUpdate,
        at: Timestamp,
    ) -> HandyResult<HelperProfile> {
        let mut tables = self.write()?;
        let profile =
            HelperProfile::from_update(user_id, tables.helper_profiles.get(&user_id), update, at)?;
        tables.helper_profiles.insert(user_id, profile.clone());
        Ok(profile)
    }

    // === Task Operations ===

    async fn task_insert(&self, task: &Task) -> HandyResult<()> {
        let mut tables = self.write()?;
        if tables.tasks.contains_key(&task.id) {
            return Err(HandyError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Task,
                reason: "already exists".to_string(),
            }));
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn task_get(&self, id: TaskId) -> HandyResult<Option<Task>> {
        Ok(self.read()?.tasks.get(&id).cloned())
    }

    async fn task_list_by_poster(
        &self,
        poster_id: UserId,
        status: Option<TaskStatus>,
    ) -> HandyResult<Vec<TaskWithApplicationCount>> {
        let tables = self.read()?;
        let mut tasks: Vec<TaskWithApplicationCount> = tables
            .tasks
            .values()
            .filter(|t| t.poster_id == poster_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .map(|t| TaskWithApplicationCount {
                task: t.clone(),
                application_count: tables.application_count(t.id),
            })
            .collect();
        newest_first(&mut tasks, |t| (t.task.created_at, t.task.id));
        Ok(tasks)
    }

    async fn task_transition(
        &self,
        id: TaskId,
        expected: TaskStatus,
        next: TaskStatus,
        at: Timestamp,
    ) -> HandyResult<TransitionOutcome> {
        let mut tables = self.write()?;
        let current = tables
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::Task, id))?;
        if current.status != expected {
            return Err(WorkflowError::task_state(
                id,
                format!("This task is already {}", current.status),
            )
            .into());
        }
        let updated = handy_core::apply_status_change(current, next, at)?;
        tables.tasks.insert(id, updated.clone());

        let mut rejected = Vec::new();
        if expected == TaskStatus::Open && next != TaskStatus::Open {
            for app in tables.applications.values_mut() {
                if app.task_id == id && app.status == ApplicationStatus::Pending {
                    app.status = ApplicationStatus::Rejected;
                    app.updated_at = at;
                    rejected.push(app.clone());
                }
            }
            rejected.sort_by_key(|a| (a.created_at, a.id));
        }
        Ok(TransitionOutcome {
            task: updated,
            rejected,
        })
    }

    // === Application Operations ===

    async fn application_insert(&self, application: &Application) -> HandyResult<()> {
        let mut tables = self.write()?;
        let task = tables
            .tasks
            .get(&application.task_id)
            .ok_or_else(|| not_found(EntityType::Task, application.task_id))?;

        let duplicate = tables.applications.values().any(|a| {
            a.task_id == application.task_id && a.helper_id == application.helper_id
        });
        if duplicate {
            return Err(WorkflowError::DuplicateApplication {
                task_id: application.task_id,
                helper_id: application.helper_id,
            }
            .into());
        }
        if task.status != TaskStatus::Open {
            return Err(WorkflowError::task_state(
                task.id,
                "This task is no longer accepting applications",
            )
            .into());
        }

        tables
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn application_get(&self, id: ApplicationId) -> HandyResult<Option<Application>> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    async fn application_list_by_task(&self, task_id: TaskId) -> HandyResult<Vec<Application>> {
        let tables = self.read()?;
        let mut apps: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect();
        apps.sort_by_key(|a| (a.created_at, a.id));
        Ok(apps)
    }

    async fn application_list_by_helper(
        &self,
        helper_id: UserId,
        status: Option<ApplicationStatus>,
    ) -> HandyResult<Vec<ApplicationWithTask>> {
        let tables = self.read()?;
        let mut rows: Vec<ApplicationWithTask> = tables
            .applications
            .values()
            .filter(|a| a.helper_id == helper_id)
            .filter(|a| status.map_or(true, |s| a.status == s))
            .filter_map(|a| {
                tables.tasks.get(&a.task_id).map(|t| ApplicationWithTask {
                    application: a.clone(),
                    task: t.clone(),
                })
            })
            .collect();
        newest_first(&mut rows, |r| (r.application.created_at, r.application.id));
        Ok(rows)
    }

    async fn application_accept(
        &self,
        id: ApplicationId,
        at: Timestamp,
    ) -> HandyResult<AcceptOutcome> {
        let mut tables = self.write()?;

        // Validate everything before the first write so failure has no effect.
        let application = tables
            .applications
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::Application, id))?;
        let task = tables
            .tasks
            .get(&application.task_id)
            .cloned()
            .ok_or_else(|| not_found(EntityType::Task, application.task_id))?;
        let open = task.into_open().map_err(|_| {
            WorkflowError::task_state(application.task_id, "This task is no longer open")
        })?;
        if application.status != ApplicationStatus::Pending {
            return Err(WorkflowError::application_state(
                id,
                format!("This application was already {}", application.status),
            )
            .into());
        }

        let task = open.assign(application.helper_id, at).into_task();
        tables.tasks.insert(task.id, task.clone());

        let mut accepted = application;
        let mut rejected = Vec::new();
        for app in tables.applications.values_mut() {
            if app.task_id != task.id {
                continue;
            }
            if app.id == id {
                app.status = ApplicationStatus::Accepted;
                app.updated_at = at;
                accepted = app.clone();
            } else if app.status == ApplicationStatus::Pending {
                app.status = ApplicationStatus::Rejected;
                app.updated_at = at;
                rejected.push(app.clone());
            }
        }
        rejected.sort_by_key(|a| (a.created_at, a.id));

        Ok(AcceptOutcome {
            task,
            accepted,
            rejected,
        })
    }

    async fn application_reject(
        &self,
        id: ApplicationId,
        at: Timestamp,
    ) -> HandyResult<Application> {
        let mut tables = self.write()?;
        let app = tables
            .applications
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Application, id))?;
        if app.status != ApplicationStatus::Pending {
            return Err(WorkflowError::application_state(
                id,
                format!("This application was already {}", app.status),
            )
            .into());
        }
        app.status = ApplicationStatus::Rejected;
        app.updated_at = at;
        Ok(app.clone())
    }

    // === Message Operations ===

    async fn message_insert(&self, message: &Message) -> HandyResult<()> {
        let mut tables = self.write()?;
        tables.messages.push(message.clone());
        Ok(())
    }

    async fn message_list_by_conversation(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> HandyResult<Vec<Message>> {
        let tables = self.read()?;
        Ok(tables
            .messages
            .iter()
            .filter(|m| &m.conversation_id == conversation_id)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn message_list_for_user(&self, user_id: UserId) -> HandyResult<Vec<Message>> {
        let tables = self.read()?;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.involves(user_id))
            .cloned()
            .collect())
    }

    async fn conversation_participants(
        &self,
        conversation_id: &ConversationId,
    ) -> HandyResult<Option<(UserId, UserId)>> {
        let tables = self.read()?;
        Ok(tables
            .messages
            .iter()
            .find(|m| &m.conversation_id == conversation_id)
            .map(|m| (m.sender_id, m.recipient_id)))
    }

    async fn message_mark_read(
        &self,
        conversation_id: &ConversationId,
        user_id: UserId,
        at: Timestamp,
    ) -> HandyResult<usize> {
        let mut tables = self.write()?;
        let mut marked = 0;
        for message in tables
            .messages
            .iter_mut()
            .filter(|m| &m.conversation_id == conversation_id && m.is_unread_for(user_id))
        {
            message.read_at = Some(at);
            marked += 1;
        }
        Ok(marked)
    }

    async fn message_unread_count(&self, user_id: UserId) -> HandyResult<usize> {
        let tables = self.read()?;
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.is_unread_for(user_id))
            .count())
    }

    // === Review Operations ===

    async fn review_insert(&self, review: &Review) -> HandyResult<Profile> {
        let mut tables = self.write()?;
        if !tables.profiles.contains_key(&review.reviewee_id) {
            return Err(not_found(EntityType::Profile, review.reviewee_id));
        }
        let duplicate = tables
            .reviews
            .iter()
            .any(|r| r.task_id == review.task_id && r.reviewer_id == review.reviewer_id);
        if duplicate {
            return Err(WorkflowError::DuplicateReview {
                task_id: review.task_id,
                reviewer_id: review.reviewer_id,
            }
            .into());
        }

        tables.reviews.push(review.clone());
        let aggregate = RatingAggregate::for_reviewee(&tables.reviews, review.reviewee_id);
        let profile = tables
            .profiles
            .get_mut(&review.reviewee_id)
            .ok_or_else(|| not_found(EntityType::Profile, review.reviewee_id))?;
        profile.rating = aggregate.mean();
        profile.review_count = aggregate.count;
        profile.updated_at = review.created_at;
        Ok(profile.clone())
    }

    async fn review_list_for_user(&self, user_id: UserId) -> HandyResult<Vec<Review>> {
        let tables = self.read()?;
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| r.reviewee_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut reviews, |r| (r.created_at, r.id));
        Ok(reviews)
    }

    // === Notification / Category Operations ===

    async fn notification_insert(&self, notification: &Notification) -> HandyResult<()> {
        let mut tables = self.write()?;
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn notification_list(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> HandyResult<Vec<Notification>> {
        let tables = self.read()?;
        let mut rows: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| !unread_only || n.read_at.is_none())
            .cloned()
            .collect();
        newest_first(&mut rows, |n| (n.created_at, n.id));
        Ok(rows)
    }

    async fn notification_get(&self, id: NotificationId) -> HandyResult<Option<Notification>> {
        Ok(self.read()?.notifications.get(&id).cloned())
    }

    async fn notification_mark_read(
        &self,
        id: NotificationId,
        at: Timestamp,
    ) -> HandyResult<Notification> {
        let mut tables = self.write()?;
        let notification = tables
            .notifications
            .get_mut(&id)
            .ok_or_else(|| not_found(EntityType::Notification, id))?;
        if notification.read_at.is_none() {
            notification.read_at = Some(at);
        }
        Ok(notification.clone())
    }

    async fn category_list(&self, include_inactive: bool) -> HandyResult<Vec<TaskCategory>> {
        let tables = self.read()?;
        let mut categories: Vec<TaskCategory> = tables
            .categories
            .iter()
            .filter(|c| include_inactive || c.is_active)
            .cloned()
            .collect();
        categories.sort_by_key(|c| (c.display_order, c.name.clone()));
        Ok(categories)
    }

    async fn category_insert(&self, category: &TaskCategory) -> HandyResult<()> {
        let mut tables = self.write()?;
        if tables.categories.iter().any(|c| c.slug == category.slug) {
            return Err(HandyError::Storage(StorageError::InsertFailed {
                entity_type: EntityType::Category,
                reason: format!("slug '{}' already exists", category.slug),
            }));
        }
        tables.categories.push(category.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use handy_core::{
        conversation_id, Budget, BudgetType, ErrorKind, Location, UserRole, UserStatus,
    };

    fn task_for(poster: UserId) -> Task {
        let now = Utc::now();
        Task {
            id: TaskId::now_v7(),
            poster_id: poster,
            helper_id: None,
            title: "Fix leaking sink".to_string(),
            description: "Kitchen sink drips".to_string(),
            category: "Plumbing Repair".to_string(),
            budget: Budget {
                amount: Some(60.0),
                budget_type: BudgetType::Fixed,
            },
            location: Location {
                address: None,
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip_code: "78701".to_string(),
            },
            preferred_date: None,
            preferred_time: None,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn apply(task: TaskId, helper: UserId) -> Application {
        Application::new(task, helper, None, 40.0, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_application_rejected() {
        let store = InMemoryStore::new();
        let task = task_for(UserId::now_v7());
        store.task_insert(&task).await.unwrap();
        let helper = UserId::now_v7();

        store.application_insert(&apply(task.id, helper)).await.unwrap();
        let err = store
            .application_insert(&apply(task.id, helper))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateApplication);
        assert_eq!(store.application_list_by_task(task.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_accept_rejects_siblings_atomically() {
        let store = InMemoryStore::new();
        let task = task_for(UserId::now_v7());
        store.task_insert(&task).await.unwrap();
        let first = apply(task.id, UserId::now_v7());
        let second = apply(task.id, UserId::now_v7());
        store.application_insert(&first).await.unwrap();
        store.application_insert(&second).await.unwrap();

        let outcome = store.application_accept(first.id, Utc::now()).await.unwrap();
        assert_eq!(outcome.task.status, TaskStatus::InProgress);
        assert_eq!(outcome.task.helper_id, Some(first.helper_id));
        assert_eq!(outcome.accepted.status, ApplicationStatus::Accepted);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].id, second.id);

        let err = store
            .application_accept(second.id, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let stored = store.task_get(task.id).await.unwrap().unwrap();
        assert_eq!(stored.helper_id, Some(first.helper_id));
    }

    #[tokio::test]
    async fn test_apply_to_closed_task() {
        let store = InMemoryStore::new();
        let task = task_for(UserId::now_v7());
        store.task_insert(&task).await.unwrap();
        store
            .task_transition(task.id, TaskStatus::Open, TaskStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        let err = store
            .application_insert(&apply(task.id, UserId::now_v7()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_cancel_rejects_pending_applications() {
        let store = InMemoryStore::new();
        let task = task_for(UserId::now_v7());
        store.task_insert(&task).await.unwrap();
        let first = apply(task.id, UserId::now_v7());
        let second = apply(task.id, UserId::now_v7());
        store.application_insert(&first).await.unwrap();
        store.application_insert(&second).await.unwrap();

        let outcome = store
            .task_transition(task.id, TaskStatus::Open, TaskStatus::Cancelled, Utc::now())
            .await
            .unwrap();
        assert_eq!(outcome.task.status, TaskStatus::Cancelled);
        let ids: Vec<_> = outcome.rejected.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let stored = store.application_list_by_task(task.id).await.unwrap();
        assert!(stored.iter().all(|a| a.status == ApplicationStatus::Rejected));
        let err = store.application_reject(first.id, Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_transition_requires_expected_status() {
        let store = InMemoryStore::new();
        let task = task_for(UserId::now_v7());
        store.task_insert(&task).await.unwrap();
        let err = store
            .task_transition(task.id, TaskStatus::InProgress, TaskStatus::Completed, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_mark_read_idempotent() {
        let store = InMemoryStore::new();
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let conv = conversation_id(a, b, None);
        for content in ["hi", "are you free?"] {
            store
                .message_insert(&Message {
                    id: handy_core::MessageId::now_v7(),
                    conversation_id: conv.clone(),
                    sender_id: a,
                    recipient_id: b,
                    content: content.to_string(),
                    task_id: None,
                    attachments: vec![],
                    created_at: Utc::now(),
                    read_at: None,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.message_unread_count(b).await.unwrap(), 2);
        assert_eq!(store.message_mark_read(&conv, b, Utc::now()).await.unwrap(), 2);
        assert_eq!(store.message_mark_read(&conv, b, Utc::now()).await.unwrap(), 0);
        assert_eq!(store.message_unread_count(b).await.unwrap(), 0);
        // The sender's own messages are never "unread" for them.
        assert_eq!(store.message_mark_read(&conv, a, Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_review_recomputes_rating() {
        let store = InMemoryStore::new();
        let reviewee = UserId::now_v7();
        let now = Utc::now();
        store
            .user_upsert(&User {
                id: reviewee,
                email: "h@example.com".to_string(),
                phone: None,
                role: UserRole::Helper,
                status: UserStatus::Active,
                created_at: now,
            })
            .await
            .unwrap();
        store
            .profile_insert_if_absent(&Profile::empty(reviewee, "Hal", now))
            .await
            .unwrap();

        let r1 = Review::new(TaskId::now_v7(), UserId::now_v7(), reviewee, 5, None, now).unwrap();
        let r2 = Review::new(TaskId::now_v7(), UserId::now_v7(), reviewee, 2, None, now).unwrap();
        store.review_insert(&r1).await.unwrap();
        let profile = store.review_insert(&r2).await.unwrap();
        assert_eq!(profile.review_count, 2);
        assert_eq!(profile.rating, Some(3.5));

        let err = store.review_insert(&r1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateReview);
    }

    #[tokio::test]
    async fn test_seeded_categories() {
        let store = InMemoryStore::new();
        let categories = store.category_list(false).await.unwrap();
        assert_eq!(categories.len(), 11);
        assert!(InMemoryStore::empty().category_list(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_poster_newest_first_with_counts() {
        let store = InMemoryStore::new();
        let poster = UserId::now_v7();
        let older = task_for(poster);
        let mut newer = task_for(poster);
        newer.created_at = older.created_at + chrono::Duration::seconds(5);
        store.task_insert(&older).await.unwrap();
        store.task_insert(&newer).await.unwrap();
        store.application_insert(&apply(older.id, UserId::now_v7())).await.unwrap();

        let rows = store.task_list_by_poster(poster, None).await.unwrap();
        assert_eq!(rows[0].task.id, newer.id);
        assert_eq!(rows[1].application_count, 1);

        let open = store
            .task_list_by_poster(poster, Some(TaskStatus::Completed))
            .await
            .unwrap();
        assert!(open.is_empty());
    }
}
