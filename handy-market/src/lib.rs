//! Handy Market - Domain Services
//!
//! Each service checks entity state first, then the caller's rights, then
//! persists through [`handy_storage::MarketplaceStore`], then publishes a
//! [`handy_events::MarketEvent`] and any best-effort notifications.
//!
//! [`Marketplace`] wires every service to one store, one search backend and
//! one event hub.

use std::sync::Arc;

use handy_core::{HandyResult, MarketConfig};
use handy_events::EventHub;
use handy_storage::{InMemoryStore, InMemoryTaskSearch, MarketplaceStore, TaskSearch};

mod context;
mod matching;
mod messaging;
mod notifications;
mod pager;
mod profiles;
mod requests;
mod reviews;
mod task_service;

pub use context::AuthContext;
pub use matching::MatchingService;
pub use messaging::MessagingService;
pub use notifications::NotificationService;
pub use pager::TaskPager;
pub use profiles::{CategoryService, ProfileService};
pub use requests::{NewApplication, NewMessage, NewReview, ProfileView};
pub use reviews::ReviewService;
pub use task_service::TaskService;

/// Every marketplace service, sharing one store and one event hub.
#[derive(Clone)]
pub struct Marketplace {
    pub tasks: TaskService,
    pub matching: MatchingService,
    pub messaging: MessagingService,
    pub reviews: ReviewService,
    pub profiles: ProfileService,
    pub notifications: NotificationService,
    pub categories: CategoryService,
    events: EventHub,
    config: MarketConfig,
}

impl Marketplace {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        search: Arc<dyn TaskSearch>,
        config: MarketConfig,
    ) -> HandyResult<Self> {
        config.validate()?;
        let events = EventHub::new(config.event_capacity);
        let notifications = NotificationService::new(Arc::clone(&store), events.clone());

        Ok(Self {
            tasks: TaskService::new(
                Arc::clone(&store),
                search,
                events.clone(),
                notifications.clone(),
                config.clone(),
            ),
            matching: MatchingService::new(
                Arc::clone(&store),
                events.clone(),
                notifications.clone(),
            ),
            messaging: MessagingService::new(
                Arc::clone(&store),
                events.clone(),
                notifications.clone(),
                config.clone(),
            ),
            reviews: ReviewService::new(Arc::clone(&store), events.clone(), notifications.clone()),
            profiles: ProfileService::new(Arc::clone(&store)),
            categories: CategoryService::new(store),
            notifications,
            events,
            config,
        })
    }

    /// A marketplace over a fresh in-memory store with exact-zip search.
    pub fn in_memory(config: MarketConfig) -> HandyResult<Self> {
        let store = InMemoryStore::new();
        let search = InMemoryTaskSearch::exact(store.clone());
        Self::new(Arc::new(store), Arc::new(search), config)
    }

    pub fn events(&self) -> &EventHub {
        &self.events
    }

    pub fn config(&self) -> &MarketConfig {
        &self.config
    }
}
