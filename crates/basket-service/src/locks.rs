//! # Per-Basket Locks
//!
//! Serializes mutations on the same basket inside one process.
//!
//! ## Lock Registry
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  registry: Mutex<HashMap<user_id, Arc<Mutex<()>>>>                     │
//! │                                                                         │
//! │  add_item("u1") ──► lock registry ──► clone u1's Arc ──► unlock        │
//! │                                             │                           │
//! │                                             ▼                           │
//! │                     lock_owned() on u1 ── fetch ─ price ─ persist      │
//! │                                                                         │
//! │  add_item("u2") runs in parallel: different entry, different mutex.    │
//! │  A second add_item("u1") waits on u1's mutex until the guard drops.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries nobody holds or waits on are pruned on the next acquire.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-user basket mutexes.
#[derive(Debug, Default)]
pub struct BasketLocks {
    registry: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the duration of one basket operation.
pub type BasketGuard = OwnedMutexGuard<()>;

impl BasketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user_id`'s basket.
    pub async fn acquire(&self, user_id: &str) -> BasketGuard {
        let lock = {
            let mut registry = self.registry.lock().await;
            // Only the registry holds an idle entry
            registry.retain(|_, lock| Arc::strong_count(lock) > 1);
            registry
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }

    /// Number of baskets currently tracked.
    pub async fn len(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
