//! Handy Events - Realtime Delivery
//!
//! A topic abstraction over one broadcast channel. Services publish a
//! [`MarketEvent`] after every committed mutation; subscribers register
//! interest in a [`Topic`] and get back a token that unsubscribes on drop.

mod event;
mod hub;
mod topic;
mod wire;

pub use event::MarketEvent;
pub use hub::{EventHub, Subscription, SubscriptionHandle, SubscriptionId};
pub use topic::Topic;
pub use wire::{ClientFrame, ServerFrame};
