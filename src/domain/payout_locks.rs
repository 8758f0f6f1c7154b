//! Per-user payout serialization locks.
//!
//! [`PayoutLocks`] keeps one [`tokio::sync::Mutex`] per referred user so
//! that concurrent distribution requests for the same user serialize
//! in-process. The durable backstop across processes is the primary key
//! on the payout-claims table; this map keeps the common single-node case
//! from ever racing that constraint.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::UserId;

/// Registry of per-referred-user payout locks.
///
/// Uses a `RwLock<HashMap<...>>` for the outer map and per-entry
/// `Arc<Mutex<()>>` for fine-grained per-user locking.
///
/// # Concurrency
///
/// - Payouts for different referred users proceed concurrently.
/// - Payouts for the same referred user are serialized.
///
/// Entries are created on first use and retained; the per-user footprint
/// is one `Arc<Mutex<()>>`.
#[derive(Debug, Default)]
pub struct PayoutLocks {
    locks: RwLock<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl PayoutLocks {
    /// Creates an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the payout lock for the given referred user, waiting if
    /// another distribution for the same user is in flight.
    pub async fn acquire(&self, user: UserId) -> OwnedMutexGuard<()> {
        let existing = {
            let map = self.locks.read().await;
            map.get(&user).map(Arc::clone)
        };
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut map = self.locks.write().await;
                Arc::clone(map.entry(user).or_default())
            }
        };
        lock.lock_owned().await
    }

    /// Returns the number of users with a registered lock.
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    /// Returns `true` if no locks have been registered yet.
    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}
