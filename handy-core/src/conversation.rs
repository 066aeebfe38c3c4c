//! Deterministic conversation identifiers.
//!
//! A conversation is every message exchanged between the same two users,
//! optionally scoped to one task. Its id is derived, never stored as a
//! foreign key: hash the ordered participant pair plus the task id.

use crate::{TaskId, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hex-encoded SHA-256 digest identifying a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema), schema(value_type = String))]
pub struct ConversationId(String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Compute the conversation id for two users and an optional task.
///
/// Order-independent in `a`/`b`: the smaller UUID is always hashed first.
pub fn conversation_id(a: UserId, b: UserId, task_id: Option<TaskId>) -> ConversationId {
    let (low, high) = if a.as_uuid() <= b.as_uuid() { (a, b) } else { (b, a) };

    let mut hasher = Sha256::new();
    hasher.update(b"conv:");
    hasher.update(low.as_uuid().as_bytes());
    hasher.update(b":");
    hasher.update(high.as_uuid().as_bytes());
    if let Some(task) = task_id {
        hasher.update(b":");
        hasher.update(task.as_uuid().as_bytes());
    }
    ConversationId(hex::encode(hasher.finalize()))
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized.len() != 64 || !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::invalid(
                "conversation_id",
                "must be 64 hex characters",
            ));
        }
        Ok(ConversationId(normalized))
    }
}

impl TryFrom<String> for ConversationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_and_unscoped_differ() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let task = TaskId::now_v7();
        assert_ne!(conversation_id(a, b, None), conversation_id(a, b, Some(task)));
    }

    #[test]
    fn test_different_pairs_differ() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        let c = UserId::now_v7();
        assert_ne!(conversation_id(a, b, None), conversation_id(a, c, None));
    }

    #[test]
    fn test_parse_roundtrip_and_reject() {
        let id = conversation_id(UserId::now_v7(), UserId::now_v7(), None);
        assert_eq!(id.as_str().len(), 64);
        assert_eq!(id.to_string().parse::<ConversationId>().unwrap(), id);
        assert!("xyz".parse::<ConversationId>().is_err());
        assert!(serde_json::from_str::<ConversationId>("\"short\"").is_err());
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;
        use uuid::Uuid;

        fn arb_user() -> impl Strategy<Value = UserId> {
            any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
        }

        fn arb_task() -> impl Strategy<Value = Option<TaskId>> {
            proptest::option::of(any::<u128>().prop_map(|n| TaskId::from_uuid(Uuid::from_u128(n))))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(100))]

            #[test]
            fn prop_order_independent(a in arb_user(), b in arb_user(), t in arb_task()) {
                prop_assert_eq!(conversation_id(a, b, t), conversation_id(b, a, t));
            }

            #[test]
            fn prop_deterministic(a in arb_user(), b in arb_user(), t in arb_task()) {
                prop_assert_eq!(conversation_id(a, b, t), conversation_id(a, b, t));
            }
        }
    }
}
