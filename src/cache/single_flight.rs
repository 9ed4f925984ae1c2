//! Per-key in-flight registry
//!
//! Serializes concurrent cache misses on the same key so that only one caller
//! runs the loader while the others wait and then read what it wrote.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-key async locks.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds `key`, then holds it.
    pub async fn acquire(&self, key: &str) -> InFlightGuard {
        // Clone out of the map before awaiting so no shard lock is held
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        let guard = lock.lock_owned().await;
        InFlightGuard {
            registry: Arc::clone(&self.locks),
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Holds a key until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: Arc<DashMap<String, Arc<Mutex<()>>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Release first so the strong count reflects only waiters
        drop(self.guard.take());
        self.registry
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
