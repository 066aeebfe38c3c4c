//! Handy Core - Domain Types
//!
//! Entities, status machines, and error taxonomy for the Handy local-services
//! marketplace. All other crates depend on this one. No I/O lives here.

mod config;
mod conversation;
mod entities;
mod enums;
mod error;
mod identity;
mod lifecycle;
mod rating;
mod views;

pub use config::*;
pub use conversation::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use lifecycle::*;
pub use rating::*;
pub use views::*;
