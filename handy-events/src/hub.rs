//! Topic hub over a tokio broadcast channel.
//!
//! Every subscriber gets its own receiver on one shared channel and filters
//! by topic. Delivery is at-most-once: a subscriber that falls more than the
//! channel capacity behind skips the missed events and logs a warning.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::Stream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{MarketEvent, Topic};

/// Identifies one live subscription.
pub type SubscriptionId = u64;

/// Shared publish/subscribe hub. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<MarketEvent>,
    registry: Arc<DashMap<SubscriptionId, Topic>>,
    next_id: Arc<AtomicU64>,
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            registry: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Publish an event. Returns how many receivers saw it; zero is fine.
    pub fn publish(&self, event: MarketEvent) -> usize {
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event_type, receivers, "Published event");
                receivers
            }
            Err(_) => {
                debug!(event_type, "No receivers for event");
                0
            }
        }
    }

    /// Subscribe to one topic.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.insert(id, topic.clone());
        debug!(subscription_id = id, topic = %topic, "Subscribed");
        Subscription {
            id,
            topic,
            rx: self.tx.subscribe(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Subscribe with a callback run for each matching event.
    ///
    /// The callback runs on a spawned task, so this must be called inside a
    /// tokio runtime. Dropping the returned handle cancels the subscription.
    pub fn subscribe_with<F, Fut>(&self, topic: Topic, handler: F) -> SubscriptionHandle
    where
        F: Fn(MarketEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.subscribe(topic);
        let id = subscription.id;
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                handler(event).await;
            }
        });
        SubscriptionHandle {
            id,
            task,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Raw receiver over every event, for callers managing their own topic set.
    pub fn receiver(&self) -> broadcast::Receiver<MarketEvent> {
        self.tx.subscribe()
    }

    /// Number of live topic subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.registry.len()
    }
}

/// A live subscription to one topic. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    rx: broadcast::Receiver<MarketEvent>,
    registry: Arc<DashMap<SubscriptionId, Topic>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Next event on this topic, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<MarketEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.is_on(&self.topic) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        subscription_id = self.id,
                        topic = %self.topic,
                        skipped,
                        "Subscriber lagged, events were dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Convert into a stream of matching events. Dropping the stream unsubscribes.
    pub fn into_stream(self) -> impl Stream<Item = MarketEvent> + Send + 'static {
        futures_util::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }

    /// Explicitly end this subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.registry.remove(&self.id).is_some() {
            debug!(subscription_id = self.id, topic = %self.topic, "Unsubscribed");
        }
    }
}

/// Token for a callback subscription. Dropping it cancels delivery.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    task: JoinHandle<()>,
    registry: Arc<DashMap<SubscriptionId, Topic>>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop delivering events to the callback.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
        self.registry.remove(&self.id);
    }
}
