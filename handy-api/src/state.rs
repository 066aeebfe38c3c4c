//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use handy_market::Marketplace;

use crate::ws::WsState;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub marketplace: Marketplace,
    pub ws: Arc<WsState>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(marketplace: Marketplace) -> Self {
        let ws = Arc::new(WsState::new(&marketplace));
        Self {
            marketplace,
            ws,
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Marketplace, marketplace);
crate::impl_from_ref!(Arc<WsState>, ws);
crate::impl_from_ref!(Instant, start_time);
