//! Identity types for Handy entities
//!
//! Every persisted entity gets its own ID newtype so a `TaskId` can never be
//! passed where an `ApplicationId` is expected. All IDs are UUIDv7, which
//! embeds a Unix timestamp and keeps them sortable by creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn new_entity_id() -> Uuid {
    Uuid::now_v7()
}

/// Common behavior for typed entity identifiers.
pub trait EntityIdType:
    Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Human-readable entity name used in error messages.
    const ENTITY_NAME: &'static str;

    /// Wrap an existing UUID.
    fn from_uuid(id: Uuid) -> Self;

    /// Access the underlying UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable ID.
    fn now_v7() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }

    /// The all-zero ID, used as a placeholder in tests.
    fn nil() -> Self {
        Self::from_uuid(Uuid::nil())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String, format = Uuid))]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh timestamp-sortable ID.
            pub fn now_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity;

            fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a registered user (poster, helper, or admin).
    UserId,
    "User"
);
define_entity_id!(
    /// Identifier of a posted task.
    TaskId,
    "Task"
);
define_entity_id!(
    /// Identifier of a helper's application to a task.
    ApplicationId,
    "Application"
);
define_entity_id!(MessageId, "Message");
define_entity_id!(ReviewId, "Review");
define_entity_id!(NotificationId, "Notification");
define_entity_id!(CategoryId, "Category");
