//! Task lifecycle typestate.
//!
//! Uses the typestate pattern so illegal task transitions do not compile.
//!
//! # State Transition Diagram
//!
//! ```text
//! Task::new() → Open ──┬── assign() ──→ Assigned ──┬── complete() → Done (terminal)
//!                      │                           └── cancel() ──→ Withdrawn (terminal)
//!                      └── cancel() ──→ Withdrawn (terminal)
//! ```
//!
//! Storage only knows a runtime [`TaskStatus`]; [`Task::into_lifecycle`]
//! recovers the typed view and [`apply_status_change`] is the runtime entry
//! point used by conditional writes.

use crate::{Task, TaskId, TaskStatus, Timestamp, UserId, WorkflowError};
use std::fmt;
use std::marker::PhantomData;

// ============================================================================
// TYPESTATE MARKERS
// ============================================================================

/// Marker trait for task lifecycle states.
pub trait LifecycleState: private::Sealed + Send + Sync {
    /// Runtime status this marker corresponds to.
    const STATUS: TaskStatus;
}

/// Task is accepting applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Open;
impl LifecycleState for Open {
    const STATUS: TaskStatus = TaskStatus::Open;
}

/// A helper has been assigned and work is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assigned;
impl LifecycleState for Assigned {
    const STATUS: TaskStatus = TaskStatus::InProgress;
}

/// Work finished (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Done;
impl LifecycleState for Done {
    const STATUS: TaskStatus = TaskStatus::Completed;
}

/// Task was cancelled by its poster (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Withdrawn;
impl LifecycleState for Withdrawn {
    const STATUS: TaskStatus = TaskStatus::Cancelled;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Open {}
    impl Sealed for super::Assigned {}
    impl Sealed for super::Done {}
    impl Sealed for super::Withdrawn {}
}

// ============================================================================
// LIFECYCLE WRAPPER
// ============================================================================

/// A task with compile-time state tracking.
#[derive(Debug, Clone)]
pub struct TaskLifecycle<S: LifecycleState> {
    task: Task,
    _state: PhantomData<S>,
}

impl<S: LifecycleState> TaskLifecycle<S> {
    fn wrap(task: Task) -> Self {
        TaskLifecycle {
            task,
            _state: PhantomData,
        }
    }

    fn advance<N: LifecycleState>(mut self, at: Timestamp) -> TaskLifecycle<N> {
        self.task.status = N::STATUS;
        self.task.updated_at = at;
        TaskLifecycle::wrap(self.task)
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn task_id(&self) -> TaskId {
        self.task.id
    }

    /// Consume and return the underlying task (for persistence).
    pub fn into_task(self) -> Task {
        self.task
    }
}

impl TaskLifecycle<Open> {
    /// Commit a helper to the task.
    pub fn assign(mut self, helper_id: UserId, at: Timestamp) -> TaskLifecycle<Assigned> {
        self.task.helper_id = Some(helper_id);
        self.advance(at)
    }

    pub fn cancel(self, at: Timestamp) -> TaskLifecycle<Withdrawn> {
        self.advance(at)
    }
}

impl TaskLifecycle<Assigned> {
    /// The assigned helper. Present by construction, see `Task::into_lifecycle`.
    pub fn helper_id(&self) -> Option<UserId> {
        self.task.helper_id
    }

    pub fn complete(mut self, at: Timestamp) -> TaskLifecycle<Done> {
        self.task.completed_at = Some(at);
        self.advance(at)
    }

    pub fn cancel(self, at: Timestamp) -> TaskLifecycle<Withdrawn> {
        self.advance(at)
    }
}

impl TaskLifecycle<Done> {
    pub fn completed_at(&self) -> Option<Timestamp> {
        self.task.completed_at
    }
}

// ============================================================================
// STORAGE BOUNDARY
// ============================================================================

/// All runtime states of a task loaded from storage.
#[derive(Debug, Clone)]
pub enum LoadedTask {
    Open(TaskLifecycle<Open>),
    Assigned(TaskLifecycle<Assigned>),
    Done(TaskLifecycle<Done>),
    Withdrawn(TaskLifecycle<Withdrawn>),
}

impl LoadedTask {
    pub fn status(&self) -> TaskStatus {
        match self {
            LoadedTask::Open(_) => TaskStatus::Open,
            LoadedTask::Assigned(_) => TaskStatus::InProgress,
            LoadedTask::Done(_) => TaskStatus::Completed,
            LoadedTask::Withdrawn(_) => TaskStatus::Cancelled,
        }
    }

    pub fn into_task(self) -> Task {
        match self {
            LoadedTask::Open(t) => t.into_task(),
            LoadedTask::Assigned(t) => t.into_task(),
            LoadedTask::Done(t) => t.into_task(),
            LoadedTask::Withdrawn(t) => t.into_task(),
        }
    }
}

/// Errors when recovering a typed task from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStateError {
    /// Task is not in the expected state.
    WrongState {
        task_id: TaskId,
        expected: TaskStatus,
        actual: TaskStatus,
    },
}

impl fmt::Display for TaskStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStateError::WrongState {
                task_id,
                expected,
                actual,
            } => write!(
                f,
                "Task {} is in state {} but expected {}",
                task_id, actual, expected
            ),
        }
    }
}

impl std::error::Error for TaskStateError {}

impl From<TaskStateError> for WorkflowError {
    fn from(err: TaskStateError) -> Self {
        match err {
            TaskStateError::WrongState {
                task_id, actual, ..
            } => WorkflowError::task_state(task_id, format!("This task is already {}", actual)),
        }
    }
}

impl Task {
    /// Recover the typed lifecycle view from the stored status.
    pub fn into_lifecycle(self) -> LoadedTask {
        match self.status {
            TaskStatus::Open => LoadedTask::Open(TaskLifecycle::wrap(self)),
            TaskStatus::InProgress => LoadedTask::Assigned(TaskLifecycle::wrap(self)),
            TaskStatus::Completed => LoadedTask::Done(TaskLifecycle::wrap(self)),
            TaskStatus::Cancelled => LoadedTask::Withdrawn(TaskLifecycle::wrap(self)),
        }
    }

    /// Try to view this task as open.
    pub fn into_open(self) -> Result<TaskLifecycle<Open>, TaskStateError> {
        match self.into_lifecycle() {
            LoadedTask::Open(t) => Ok(t),
            other => Err(TaskStateError::WrongState {
                task_id: other.task_id(),
                expected: TaskStatus::Open,
                actual: other.status(),
            }),
        }
    }

    /// Try to view this task as assigned (in progress).
    pub fn into_assigned(self) -> Result<TaskLifecycle<Assigned>, TaskStateError> {
        match self.into_lifecycle() {
            LoadedTask::Assigned(t) => Ok(t),
            other => Err(TaskStateError::WrongState {
                task_id: other.task_id(),
                expected: TaskStatus::InProgress,
                actual: other.status(),
            }),
        }
    }
}

impl LoadedTask {
    pub fn task_id(&self) -> TaskId {
        match self {
            LoadedTask::Open(t) => t.task_id(),
            LoadedTask::Assigned(t) => t.task_id(),
            LoadedTask::Done(t) => t.task_id(),
            LoadedTask::Withdrawn(t) => t.task_id(),
        }
    }
}

/// Apply a status change requested at runtime.
///
/// Moving into `in-progress` needs a helper and is only reachable through
/// [`TaskLifecycle::assign`]; asking for it here is an invalid state.
pub fn apply_status_change(
    task: Task,
    next: TaskStatus,
    at: Timestamp,
) -> Result<Task, WorkflowError> {
    let task_id = task.id;
    let from = task.status;
    if !from.can_transition_to(next) {
        return Err(WorkflowError::InvalidTransition {
            task_id,
            from,
            to: next,
        });
    }

    match (task.into_lifecycle(), next) {
        (LoadedTask::Open(_), TaskStatus::InProgress) => Err(WorkflowError::task_state(
            task_id,
            "A task moves to in-progress only when an application is accepted",
        )),
        (LoadedTask::Open(t), TaskStatus::Cancelled) => Ok(t.cancel(at).into_task()),
        (LoadedTask::Assigned(t), TaskStatus::Completed) => Ok(t.complete(at).into_task()),
        (LoadedTask::Assigned(t), TaskStatus::Cancelled) => Ok(t.cancel(at).into_task()),
        _ => Err(WorkflowError::InvalidTransition {
            task_id,
            from,
            to: next,
        }),
    }
}
