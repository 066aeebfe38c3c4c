//! Async storage trait for marketplace entities.
//!
//! Every mutation that must be atomic across rows (apply, accept, transition,
//! review) is a single trait method. Implementations must run each of those
//! as one unit: no other operation may observe an intermediate state.

use ::async_trait::async_trait;
use handy_core::{
    Application, ApplicationId, ApplicationStatus, ApplicationWithTask, ConversationId,
    HandyResult, HelperProfile, HelperProfileUpdate, Message, Notification, NotificationId,
    Profile, ProfileUpdate, Review, Task, TaskCategory, TaskId, TaskStatus,
    TaskWithApplicationCount, Timestamp, User, UserId,
};

/// Result of accepting an application.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptOutcome {
    /// The task, now in progress with `helper_id` set.
    pub task: Task,
    pub accepted: Application,
    /// Siblings that were pending and are now rejected.
    pub rejected: Vec<Application>,
}

/// Result of a task status change.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub task: Task,
    /// Applications that were still pending when the task left `open`.
    pub rejected: Vec<Application>,
}

/// Async storage trait for the marketplace.
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    // ========================================================================
    // USER / PROFILE OPERATIONS
    // ========================================================================

    /// Insert the user if absent. Returns the stored row (the existing one wins).
    async fn user_upsert(&self, user: &User) -> HandyResult<User>;

    async fn user_get(&self, id: UserId) -> HandyResult<Option<User>>;

    /// Insert the profile if absent. Returns the stored row.
    async fn profile_insert_if_absent(&self, profile: &Profile) -> HandyResult<Profile>;

    async fn profile_get(&self, user_id: UserId) -> HandyResult<Option<Profile>>;

    /// Apply a partial update to an existing profile.
    async fn profile_update(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
        at: Timestamp,
    ) -> HandyResult<Profile>;

    async fn helper_profile_get(&self, user_id: UserId) -> HandyResult<Option<HelperProfile>>;

    /// Create or refresh a helper profile, keeping staff-owned fields.
    async fn helper_profile_upsert(
        &self,
        user_id: UserId,
        update: HelperProfileUpdate,
        at: Timestamp,
    ) -> HandyResult<HelperProfile>;

    // ========================================================================
    // TASK OPERATIONS
    // ========================================================================

    async fn task_insert(&self, task: &Task) -> HandyResult<()>;

    async fn task_get(&self, id: TaskId) -> HandyResult<Option<Task>>;

    /// A poster's tasks, newest first, each with its application count.
    async fn task_list_by_poster(
        &self,
        poster_id: UserId,
        status: Option<TaskStatus>,
    ) -> HandyResult<Vec<TaskWithApplicationCount>>;

    /// Conditional status change: succeeds only if the task is still in
    /// `expected`, and only along the lifecycle transition table.
    ///
    /// Leaving `open` rejects every pending application of the task in the
    /// same unit.
    async fn task_transition(
        &self,
        id: TaskId,
        expected: TaskStatus,
        next: TaskStatus,
        at: Timestamp,
    ) -> HandyResult<TransitionOutcome>;

    // ========================================================================
    // APPLICATION OPERATIONS
    // ========================================================================

    /// Insert a pending application.
    ///
    /// Fails with `DuplicateApplication` if the (task, helper) pair exists and
    /// with `InvalidState` if the task is not open.
    async fn application_insert(&self, application: &Application) -> HandyResult<()>;

    async fn application_get(&self, id: ApplicationId) -> HandyResult<Option<Application>>;

    /// Applications for a task, oldest first.
    async fn application_list_by_task(&self, task_id: TaskId) -> HandyResult<Vec<Application>>;

    /// A helper's applications with their tasks, newest first.
    async fn application_list_by_helper(
        &self,
        helper_id: UserId,
        status: Option<ApplicationStatus>,
    ) -> HandyResult<Vec<ApplicationWithTask>>;

    /// Accept one application as a single atomic unit: the application becomes
    /// accepted, every pending sibling rejected, and the task in progress with
    /// the helper assigned. Fails with `InvalidState` and no effect if the task
    /// is not open or the application is not pending.
    async fn application_accept(&self, id: ApplicationId, at: Timestamp)
        -> HandyResult<AcceptOutcome>;

    /// Reject one pending application. The task is untouched.
    async fn application_reject(&self, id: ApplicationId, at: Timestamp)
        -> HandyResult<Application>;

    // ========================================================================
    // MESSAGE OPERATIONS
    // ========================================================================

    /// Append a message. Insertion order is creation order.
    async fn message_insert(&self, message: &Message) -> HandyResult<()>;

    /// One page of a conversation, oldest to newest.
    async fn message_list_by_conversation(
        &self,
        conversation_id: &ConversationId,
        limit: usize,
        offset: usize,
    ) -> HandyResult<Vec<Message>>;

    /// Every message sent or received by `user_id`, in creation order.
    async fn message_list_for_user(&self, user_id: UserId) -> HandyResult<Vec<Message>>;

    /// The two participants of a conversation, if it has any messages.
    async fn conversation_participants(
        &self,
        conversation_id: &ConversationId,
    ) -> HandyResult<Option<(UserId, UserId)>>;

    /// Set `read_at` on unread messages addressed to `user_id`. Returns how many changed.
    async fn message_mark_read(
        &self,
        conversation_id: &ConversationId,
        user_id: UserId,
        at: Timestamp,
    ) -> HandyResult<usize>;

    async fn message_unread_count(&self, user_id: UserId) -> HandyResult<usize>;

    // ========================================================================
    // REVIEW OPERATIONS
    // ========================================================================

    /// Insert a review and recompute the reviewee's rating in the same unit.
    ///
    /// Fails with `DuplicateReview` if the reviewer already reviewed the task.
    /// Returns the reviewee's refreshed profile.
    async fn review_insert(&self, review: &Review) -> HandyResult<Profile>;

    /// Reviews received by a user, newest first.
    async fn review_list_for_user(&self, user_id: UserId) -> HandyResult<Vec<Review>>;

    // ========================================================================
    // NOTIFICATION / CATEGORY OPERATIONS
    // ========================================================================

    async fn notification_insert(&self, notification: &Notification) -> HandyResult<()>;

    /// A user's notifications, newest first.
    async fn notification_list(
        &self,
        user_id: UserId,
        unread_only: bool,
    ) -> HandyResult<Vec<Notification>>;

    async fn notification_get(&self, id: NotificationId) -> HandyResult<Option<Notification>>;

    /// Set `read_at` if unset. Idempotent.
    async fn notification_mark_read(
        &self,
        id: NotificationId,
        at: Timestamp,
    ) -> HandyResult<Notification>;

    /// Categories ordered by `display_order`.
    async fn category_list(&self, include_inactive: bool) -> HandyResult<Vec<TaskCategory>>;

    async fn category_insert(&self, category: &TaskCategory) -> HandyResult<()>;
}
