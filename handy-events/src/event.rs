//! Marketplace event types.
//!
//! Every mutation performed by the marketplace services publishes one of
//! these. Events are routed to subscribers by [`MarketEvent::topics`].

use handy_core::{
    Application, ConversationId, Message, Notification, Review, Task, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

use crate::Topic;

/// Realtime event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MarketEvent {
    // ========================================================================
    // TASK EVENTS
    // ========================================================================
    TaskCreated {
        task: Task,
    },

    /// Status, helper or completion time changed.
    TaskUpdated {
        task: Task,
    },

    // ========================================================================
    // APPLICATION EVENTS
    // ========================================================================
    ApplicationCreated {
        application: Application,
        /// Poster of the target task; the only other party allowed to see it.
        poster_id: UserId,
    },

    ApplicationUpdated {
        application: Application,
        poster_id: UserId,
    },

    // ========================================================================
    // MESSAGE EVENTS
    // ========================================================================
    MessageCreated {
        message: Message,
    },

    /// The reader opened the conversation; `count` messages flipped to read.
    MessagesRead {
        conversation_id: ConversationId,
        reader_id: UserId,
        other_user_id: UserId,
        count: usize,
        read_at: Timestamp,
    },

    // ========================================================================
    // PROFILE / NOTIFICATION EVENTS
    // ========================================================================
    ReviewCreated {
        review: Review,
    },

    NotificationCreated {
        notification: Notification,
    },
}

impl MarketEvent {
    /// The serde tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            MarketEvent::TaskCreated { .. } => "TaskCreated",
            MarketEvent::TaskUpdated { .. } => "TaskUpdated",
            MarketEvent::ApplicationCreated { .. } => "ApplicationCreated",
            MarketEvent::ApplicationUpdated { .. } => "ApplicationUpdated",
            MarketEvent::MessageCreated { .. } => "MessageCreated",
            MarketEvent::MessagesRead { .. } => "MessagesRead",
            MarketEvent::ReviewCreated { .. } => "ReviewCreated",
            MarketEvent::NotificationCreated { .. } => "NotificationCreated",
        }
    }

    /// Topics this event is delivered on.
    pub fn topics(&self) -> Vec<Topic> {
        match self {
            MarketEvent::TaskCreated { task } | MarketEvent::TaskUpdated { task } => {
                vec![Topic::Task(task.id)]
            }
            MarketEvent::ApplicationCreated { application, .. }
            | MarketEvent::ApplicationUpdated { application, .. } => {
                vec![Topic::TaskApplications(application.task_id)]
            }
            MarketEvent::MessageCreated { message } => vec![
                Topic::Conversation(message.conversation_id.clone()),
                Topic::Inbox(message.recipient_id),
            ],
            MarketEvent::MessagesRead {
                conversation_id, ..
            } => vec![Topic::Conversation(conversation_id.clone())],
            MarketEvent::ReviewCreated { review } => vec![Topic::Inbox(review.reviewee_id)],
            MarketEvent::NotificationCreated { notification } => {
                vec![Topic::Inbox(notification.user_id)]
            }
        }
    }

    /// Whether this event belongs to `topic`.
    pub fn is_on(&self, topic: &Topic) -> bool {
        self.topics().iter().any(|t| t == topic)
    }

    /// Whether `user` is allowed to receive this event.
    pub fn visible_to(&self, user: UserId) -> bool {
        match self {
            MarketEvent::TaskCreated { .. } | MarketEvent::TaskUpdated { .. } => true,
            MarketEvent::ApplicationCreated {
                application,
                poster_id,
            }
            | MarketEvent::ApplicationUpdated {
                application,
                poster_id,
            } => application.helper_id == user || *poster_id == user,
            MarketEvent::MessageCreated { message } => message.involves(user),
            MarketEvent::MessagesRead {
                reader_id,
                other_user_id,
                ..
            } => *reader_id == user || *other_user_id == user,
            MarketEvent::ReviewCreated { review } => {
                review.reviewee_id == user || review.reviewer_id == user
            }
            MarketEvent::NotificationCreated { notification } => notification.user_id == user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use handy_core::{conversation_id, MessageId, TaskId};

    fn message(sender: UserId, recipient: UserId) -> Message {
        Message {
            id: MessageId::now_v7(),
            conversation_id: conversation_id(sender, recipient, None),
            sender_id: sender,
            recipient_id: recipient,
            content: "On my way".to_string(),
            task_id: None,
            attachments: vec![],
            created_at: Utc::now(),
            read_at: None,
        }
    }

    #[test]
    fn test_message_topics_and_visibility() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let event = MarketEvent::MessageCreated {
            message: message(a, b),
        };
        assert!(event.is_on(&Topic::Conversation(conversation_id(b, a, None))));
        assert!(event.is_on(&Topic::Inbox(b)));
        assert!(!event.is_on(&Topic::Inbox(a)));
        assert!(event.visible_to(a));
        assert!(event.visible_to(b));
        assert!(!event.visible_to(UserId::now_v7()));
    }

    #[test]
    fn test_application_visible_to_poster_and_helper() {
        let poster = UserId::now_v7();
        let helper = UserId::now_v7();
        let application =
            Application::new(TaskId::now_v7(), helper, None, 30.0, Utc::now()).unwrap();
        let event = MarketEvent::ApplicationCreated {
            application: application.clone(),
            poster_id: poster,
        };
        assert!(event.visible_to(poster));
        assert!(event.visible_to(helper));
        assert!(!event.visible_to(UserId::now_v7()));
        assert_eq!(
            event.topics(),
            vec![Topic::TaskApplications(application.task_id)]
        );
    }

    #[test]
    fn test_event_type_matches_serde_tag() {
        let event = MarketEvent::MessageCreated {
            message: message(UserId::now_v7(), UserId::now_v7()),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.event_type());
    }
}
