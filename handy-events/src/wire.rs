//! Frames exchanged over the realtime WebSocket.

use handy_core::UserId;
use serde::{Deserialize, Serialize};

use crate::{MarketEvent, Topic};

/// Sent by the client.
///
/// `{"action": "subscribe", "topic": {"kind": "task", "id": "..."}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { topic: Topic },
    Unsubscribe { topic: Topic },
}

/// Sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    Connected { user_id: UserId },
    Subscribed { topic: Topic },
    Unsubscribed { topic: Topic },
    Event { topic: Topic, event: MarketEvent },
    /// A frame was rejected; the connection stays open.
    Error { message: String },
}
