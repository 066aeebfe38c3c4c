//! Realtime topic subscriptions over the API WebSocket.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use handy_events::{ClientFrame, ServerFrame, Topic};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::api_client::{jittered_backoff, ApiClientError};
use crate::config::{BackoffConfig, ClientConfig};
use crate::Session;

#[derive(Clone)]
pub struct RealtimeClient {
    endpoint: String,
    session: Session,
    reconnect: BackoffConfig,
}

impl RealtimeClient {
    pub fn new(config: &ClientConfig, session: Session) -> Self {
        Self {
            endpoint: config.ws_endpoint.clone(),
            session,
            reconnect: config.reconnect.clone(),
        }
    }

    pub fn reconnect_config(&self) -> &BackoffConfig {
        &self.reconnect
    }

    /// Open one connection signed with the current session token.
    pub async fn connect(&self) -> Result<RealtimeConnection, ApiClientError> {
        let bearer = self.session.bearer().ok_or(ApiClientError::NotLoggedIn)?;
        let mut request = self.endpoint.as_str().into_client_request()?;
        let value = HeaderValue::from_str(&bearer)
            .map_err(|e| ApiClientError::InvalidResponse(e.to_string()))?;
        request.headers_mut().insert("authorization", value);
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        debug!(endpoint = %self.endpoint, "Realtime connection opened");
        Ok(RealtimeConnection { stream })
    }
}

/// One open socket.
pub struct RealtimeConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl RealtimeConnection {
    pub async fn subscribe(&mut self, topic: Topic) -> Result<(), ApiClientError> {
        self.send(&ClientFrame::Subscribe { topic }).await
    }

    pub async fn unsubscribe(&mut self, topic: Topic) -> Result<(), ApiClientError> {
        self.send(&ClientFrame::Unsubscribe { topic }).await
    }

    async fn send(&mut self, frame: &ClientFrame) -> Result<(), ApiClientError> {
        let text = serde_json::to_string(frame)?;
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    /// The next server frame, or `None` once the socket is closed.
    pub async fn next_frame(&mut self) -> Option<Result<ServerFrame, ApiClientError>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).map_err(ApiClientError::from));
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
        None
    }

    pub async fn close(mut self) -> Result<(), ApiClientError> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Keep `topics` subscribed across reconnects and forward every frame to `sender`.
///
/// Stops when the receiver side of `sender` is dropped or the session is cleared.
pub fn spawn_realtime(
    client: RealtimeClient,
    topics: Vec<Topic>,
    sender: mpsc::Sender<ServerFrame>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let topics: HashSet<Topic> = topics.into_iter().collect();
        let mut attempt = 0;
        loop {
            match client.connect().await {
                Ok(mut connection) => {
                    attempt = 0;
                    info!(topics = topics.len(), "Realtime connected");
                    for topic in &topics {
                        if let Err(e) = connection.subscribe(topic.clone()).await {
                            warn!(error = %e, %topic, "Subscribe failed");
                        }
                    }
                    while let Some(frame) = connection.next_frame().await {
                        match frame {
                            Ok(frame) => {
                                if sender.send(frame).await.is_err() {
                                    return;
                                }
                            }
                            Err(ApiClientError::Serde(e)) => {
                                warn!(error = %e, "Realtime decode error");
                            }
                            Err(e) => {
                                warn!(error = %e, "Realtime connection error");
                                break;
                            }
                        }
                    }
                    info!("Realtime disconnected");
                }
                Err(ApiClientError::NotLoggedIn) => {
                    debug!("Session cleared, realtime stopping");
                    return;
                }
                Err(e) => warn!(error = %e, attempt, "Realtime connect failed"),
            }

            if sender.is_closed() {
                return;
            }
            let reconnect = client.reconnect_config();
            let delay = jittered_backoff(reconnect.delay_ms(attempt), reconnect.jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            attempt = attempt.saturating_add(1);
        }
    })
}
