//! Subscription topics.

use handy_core::{ConversationId, TaskId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a subscriber is interested in.
///
/// Serialized as `{"kind": "task", "id": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Topic {
    /// Status changes of one task.
    Task(TaskId),
    /// Applications created or updated on one task.
    TaskApplications(TaskId),
    /// New messages and read receipts in one conversation.
    Conversation(ConversationId),
    /// Everything addressed to one user: messages and notifications.
    Inbox(UserId),
}

impl Topic {
    /// Whether `user` may subscribe at all.
    ///
    /// Only inbox topics are owner-restricted here. Per-event visibility is
    /// checked separately by [`crate::MarketEvent::visible_to`].
    pub fn may_subscribe(&self, user: UserId) -> bool {
        match self {
            Topic::Inbox(owner) => *owner == user,
            _ => true,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Task(id) => write!(f, "task-{}", id),
            Topic::TaskApplications(id) => write!(f, "applications-{}", id),
            Topic::Conversation(id) => write!(f, "messages-{}", id),
            Topic::Inbox(id) => write!(f, "inbox-{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_topic_wire_shape() {
        let task = TaskId::now_v7();
        let topic = Topic::TaskApplications(task);
        let value = serde_json::to_value(&topic).unwrap();
        assert_eq!(value, json!({"kind": "task_applications", "id": task.to_string()}));
        let back: Topic = serde_json::from_value(value).unwrap();
        assert_eq!(back, topic);
    }

    #[test]
    fn test_inbox_owner_only() {
        let me = UserId::now_v7();
        assert!(Topic::Inbox(me).may_subscribe(me));
        assert!(!Topic::Inbox(UserId::now_v7()).may_subscribe(me));
        assert!(Topic::Task(TaskId::now_v7()).may_subscribe(me));
    }

    #[test]
    fn test_display_channel_names() {
        let task = TaskId::now_v7();
        assert_eq!(Topic::Task(task).to_string(), format!("task-{}", task));
    }
}
