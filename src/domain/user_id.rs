//! Type-safe user identifier.
//!
//! [`UserId`] is a newtype wrapper around `i64` (the ledger's BIGSERIAL
//! primary key) providing type safety so that user identifiers cannot be
//! confused with other row ids.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a user account.
///
/// Wraps the ledger-assigned `i64` primary key. Assigned once at signup
/// and immutable thereafter. Used as the key in referral edges, payout
/// claims, transaction rows, and WebSocket subscription targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Creates a `UserId` from a raw ledger row id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the inner `i64` row id.
    #[must_use]
    pub const fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<UserId> for i64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_plain_integer() {
        let id = UserId::new(42);
        assert_eq!(format!("{id}"), "42");
    }

    #[test]
    fn serde_round_trip() {
        let id = UserId::new(7);
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json, "7");
        let deserialized: UserId = serde_json::from_str(&json).ok().unwrap_or_else(|| {
            panic!("deserialization failed");
        });
        assert_eq!(id, deserialized);
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let id = UserId::new(3);
        let mut map = HashMap::new();
        map.insert(id, "test");
        assert_eq!(map.get(&id), Some(&"test"));
    }

    #[test]
    fn round_trips_through_i64() {
        let id = UserId::from(99_i64);
        assert_eq!(i64::from(id), 99);
    }
}
