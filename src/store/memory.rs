//! In-Memory Store Module
//!
//! HashMap-backed `KvStore` with sliding expiration. Used when no Redis
//! server is configured and as the backend for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyPrefix, KvStore, StoredEntry};
use crate::error::StoreError;

// == Memory Store ==
/// In-process key-value store.
///
/// Keys are held in their prefixed form, as a shared remote store would.
#[derive(Debug)]
pub struct MemoryStore {
    /// Prefixed key -> entry
    entries: RwLock<HashMap<String, StoredEntry>>,
    /// Namespace applied to caller keys
    prefix: KeyPrefix,
    /// When false every operation fails as if the server were down
    reachable: AtomicBool,
}

impl MemoryStore {
    // == Constructor ==
    pub fn new(prefix: KeyPrefix) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            prefix,
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulates the store going down (`false`) or coming back (`true`).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Writes a raw key verbatim, bypassing the prefix.
    ///
    /// Lets callers model keys written by other tenants sharing the store.
    pub async fn insert_raw(&self, raw_key: &str, value: String, sliding: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(raw_key.to_string(), StoredEntry::new(value, sliding));
    }

    /// Raw keys currently held, expired or not.
    pub async fn raw_keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Returns the current number of entries, including not yet swept ones.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_reachable()?;
        let raw = self.prefix.apply(key);

        // Write lock: a hit slides the expiration
        let mut entries = self.entries.write().await;
        match entries.get_mut(&raw) {
            Some(entry) if !entry.is_expired() => {
                entry.touch();
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => {}
            None => return Ok(None),
        }

        // Lazily drop the expired entry
        entries.remove(&raw);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, sliding: Duration) -> Result<(), StoreError> {
        self.check_reachable()?;
        let mut entries = self.entries.write().await;
        entries.insert(self.prefix.apply(key), StoredEntry::new(value, sliding));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check_reachable()?;
        let mut entries = self.entries.write().await;
        Ok(entries.remove(&self.prefix.apply(key)).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.check_reachable()?;
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(raw, entry)| self.prefix.owns(raw) && !entry.is_expired())
            .map(|(raw, _)| raw.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_reachable()
    }

    fn key_prefix(&self) -> &KeyPrefix {
        &self.prefix
    }
}
