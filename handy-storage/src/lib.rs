//! Handy Storage - Persistence Layer
//!
//! The [`MarketplaceStore`] trait is the seam every service talks through.
//! [`InMemoryStore`] is the shipped implementation; it serializes writes
//! behind one lock so the cross-row operations (apply, accept, review) are
//! atomic. Task search lives behind its own [`TaskSearch`] trait.

mod memory;
mod search;
mod store;

pub use memory::InMemoryStore;
pub use search::{ExactZipDistance, InMemoryTaskSearch, TaskSearch, ZipDistance};
pub use store::{AcceptOutcome, MarketplaceStore, TransitionOutcome};
