//! WebSocket Realtime Feed
//!
//! Clients subscribe to [`Topic`]s over one socket and receive the matching
//! [`MarketEvent`]s as [`ServerFrame::Event`] frames.
//!
//! ## Protocol
//!
//! 1. Client connects to `GET /api/v1/ws` with `Authorization: Bearer <token>`
//! 2. Server sends `Connected`
//! 3. Client sends `{"action": "subscribe", "topic": {...}}`
//! 4. Server answers `Subscribed` (or `Error`) and starts forwarding events
//! 5. `unsubscribe` stops forwarding; closing the socket drops everything
//!
//! Inbox topics are owner-only and conversation topics participant-only.
//! Every forwarded event is also checked with [`MarketEvent::visible_to`].

use crate::error::ApiResult;
use crate::middleware::AuthExtractor;
use crate::telemetry::metrics;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use handy_events::{ClientFrame, EventHub, MarketEvent, ServerFrame, SubscriptionHandle, Topic};
use handy_market::{AuthContext, Marketplace, MessagingService};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Frames queued per connection before the forwarders start waiting.
const OUTBOUND_BUFFER: usize = 256;

/// WebSocket state shared across the application.
#[derive(Clone)]
pub struct WsState {
    events: EventHub,
    messaging: MessagingService,
}

impl WsState {
    pub fn new(marketplace: &Marketplace) -> Self {
        Self {
            events: marketplace.events().clone(),
            messaging: marketplace.messaging.clone(),
        }
    }

    /// Live topic subscriptions across all connections.
    pub fn active_subscriptions(&self) -> usize {
        self.events.active_subscriptions()
    }

    /// Checks whether `auth` may follow `topic`.
    async fn authorize(&self, auth: &AuthContext, topic: &Topic) -> Result<(), String> {
        if !topic.may_subscribe(auth.user_id) {
            return Err(format!("Not allowed to subscribe to {}", topic));
        }
        if let Topic::Conversation(id) = topic {
            self.messaging
                .authorize_conversation(auth, id)
                .await
                .map_err(|e| e.user_message())?;
        }
        Ok(())
    }
}

/// WebSocket upgrade handler.
#[utoipa::path(
    get,
    path = "/api/v1/ws",
    tag = "Realtime",
    responses(
        (status = 101, description = "Switching to the realtime WebSocket protocol"),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<Response> {
    info!(user_id = %auth.user_id, "WebSocket connection request");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, auth)))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>, auth: AuthContext) {
    let user_id = auth.user_id;
    info!(user_id = %user_id, "WebSocket connected");
    if let Some(m) = metrics() {
        m.ws_connected();
    }

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(OUTBOUND_BUFFER);

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = send_frame(&mut sender, &frame).await {
                debug!(error = %e, "Failed to send frame, closing writer");
                break;
            }
        }
    });

    if tx.send(ServerFrame::Connected { user_id }).await.is_err() {
        error!(user_id = %user_id, "Writer closed before Connected was sent");
    }

    let mut subscriptions: HashMap<Topic, SubscriptionHandle> = HashMap::new();
    loop {
        tokio::select! {
            msg = receiver.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(user_id = %user_id, error = %e, "WebSocket receive error");
                        break;
                    }
                };
                let reply = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => handle_frame(&state, &auth, &tx, &mut subscriptions, frame).await,
                    Err(e) => ServerFrame::Error { message: format!("Invalid frame: {}", e) },
                };
                if tx.send(reply).await.is_err() {
                    break;
                }
            }
            _ = &mut send_task => {
                debug!(user_id = %user_id, "Writer finished");
                break;
            }
        }
    }

    let dropped = subscriptions.len();
    subscriptions.clear();
    send_task.abort();
    if let Some(m) = metrics() {
        m.ws_disconnected();
    }
    info!(user_id = %user_id, dropped, "WebSocket disconnected");
}

async fn handle_frame(
    state: &WsState,
    auth: &AuthContext,
    tx: &mpsc::Sender<ServerFrame>,
    subscriptions: &mut HashMap<Topic, SubscriptionHandle>,
    frame: ClientFrame,
) -> ServerFrame {
    match frame {
        ClientFrame::Subscribe { topic } => {
            if subscriptions.contains_key(&topic) {
                return ServerFrame::Subscribed { topic };
            }
            if let Err(message) = state.authorize(auth, &topic).await {
                debug!(user_id = %auth.user_id, topic = %topic, "Subscription refused");
                return ServerFrame::Error { message };
            }
            let handle = forward(&state.events, auth.clone(), topic.clone(), tx.clone());
            subscriptions.insert(topic.clone(), handle);
            ServerFrame::Subscribed { topic }
        }
        ClientFrame::Unsubscribe { topic } => {
            subscriptions.remove(&topic);
            ServerFrame::Unsubscribed { topic }
        }
    }
}

/// Forward visible events on `topic` into the connection's outbound queue.
fn forward(
    events: &EventHub,
    auth: AuthContext,
    topic: Topic,
    tx: mpsc::Sender<ServerFrame>,
) -> SubscriptionHandle {
    let frame_topic = topic.clone();
    events.subscribe_with(topic, move |event: MarketEvent| {
        let tx = tx.clone();
        let topic = frame_topic.clone();
        let visible = event.visible_to(auth.user_id);
        let user_id = auth.user_id;
        let event_type = event.event_type();
        async move {
            if visible && tx.send(ServerFrame::Event { topic, event }).await.is_err() {
                debug!(
                    user_id = %user_id,
                    event_type,
                    "Outbound queue closed, event dropped"
                );
            }
        }
    })
}

async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(|e| {
        error!(error = %e, "Failed to serialize frame");
        axum::Error::new(e)
    })?;
    sender.send(Message::Text(json)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use handy_core::{conversation_id, UserId, UserRole};

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext::new(UserId::now_v7(), "u@example.com", role)
    }

    #[tokio::test]
    async fn test_inbox_is_owner_only() -> Result<(), String> {
        let marketplace = Marketplace::in_memory(Default::default()).map_err(|e| e.to_string())?;
        let state = WsState::new(&marketplace);
        let me = ctx(UserRole::Helper);

        assert!(state.authorize(&me, &Topic::Inbox(me.user_id)).await.is_ok());
        assert!(state
            .authorize(&me, &Topic::Inbox(UserId::now_v7()))
            .await
            .is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe_track_hub() -> Result<(), String> {
        let marketplace = Marketplace::in_memory(Default::default()).map_err(|e| e.to_string())?;
        let state = WsState::new(&marketplace);
        let me = ctx(UserRole::Poster);
        let (tx, _rx) = mpsc::channel(8);
        let mut subs = HashMap::new();
        let topic = Topic::Inbox(me.user_id);

        let reply = handle_frame(
            &state,
            &me,
            &tx,
            &mut subs,
            ClientFrame::Subscribe { topic: topic.clone() },
        )
        .await;
        assert_eq!(reply, ServerFrame::Subscribed { topic: topic.clone() });
        assert_eq!(state.active_subscriptions(), 1);

        let reply = handle_frame(
            &state,
            &me,
            &tx,
            &mut subs,
            ClientFrame::Unsubscribe { topic: topic.clone() },
        )
        .await;
        assert_eq!(reply, ServerFrame::Unsubscribed { topic });
        assert_eq!(state.active_subscriptions(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_conversation_is_subscribable() -> Result<(), String> {
        let marketplace = Marketplace::in_memory(Default::default()).map_err(|e| e.to_string())?;
        let state = WsState::new(&marketplace);
        let me = ctx(UserRole::Helper);
        let topic = Topic::Conversation(conversation_id(me.user_id, UserId::now_v7(), None));
        assert!(state.authorize(&me, &topic).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_queue_keeps_subscription_alive() -> Result<(), String> {
        let hub = EventHub::new(16);
        let me = ctx(UserRole::Helper);
        let other = UserId::now_v7();
        let conversation = conversation_id(me.user_id, other, None);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let handle = forward(&hub, me.clone(), Topic::Conversation(conversation.clone()), tx);
        for _ in 0..2 {
            hub.publish(MarketEvent::MessagesRead {
                conversation_id: conversation.clone(),
                reader_id: other,
                other_user_id: me.user_id,
                count: 1,
                read_at: chrono::Utc::now(),
            });
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(hub.active_subscriptions(), 1);

        drop(handle);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(hub.active_subscriptions(), 0);
        Ok(())
    }
}
