//! Cache Introspection Service
//!
//! Administrative view over the store: status, list, fetch, delete, clear.
//! Every operation except `status` is gated on a fresh health probe so that
//! "unreachable" is never reported as "not found".

use std::sync::Arc;

use tracing::{debug, info};

use super::health::HealthMonitor;
use crate::error::{CacheError, Result, StoreError};
use crate::store::KvStore;

/// Reported in place of a value that could not be read.
pub const NULL_MARKER: &str = "null";

// == Cache Status ==
/// Connectivity snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatus {
    pub available: bool,
}

impl CacheStatus {
    pub fn label(&self) -> &'static str {
        if self.available {
            "Connected"
        } else {
            "Redis server down"
        }
    }
}

// == Cache Entry ==
/// A key in caller form and its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
}

// == Cache Introspection ==
#[derive(Clone)]
pub struct CacheIntrospection {
    store: Arc<dyn KvStore>,
    health: HealthMonitor,
}

impl CacheIntrospection {
    pub fn new(store: Arc<dyn KvStore>, health: HealthMonitor) -> Self {
        Self { store, health }
    }

    /// Current connectivity. Never fails.
    pub async fn status(&self) -> CacheStatus {
        CacheStatus {
            available: self.health.is_available().await,
        }
    }

    async fn ensure_available(&self) -> Result<()> {
        if self.health.is_available().await {
            Ok(())
        } else {
            Err(CacheError::StoreUnavailable(
                "health probe failed".to_string(),
            ))
        }
    }

    /// Caller-form keys in the store's enumeration order.
    async fn caller_keys(&self) -> Result<Vec<String>> {
        let prefix = self.store.key_prefix();
        Ok(self
            .store
            .keys()
            .await?
            .iter()
            .map(|raw| prefix.strip(raw).to_string())
            .collect())
    }

    // == List All ==
    /// Every key in the namespace with its value, or [`NULL_MARKER`] when the
    /// value cannot be read.
    pub async fn list_all(&self) -> Result<Vec<CacheEntry>> {
        self.ensure_available().await?;

        let keys = self.caller_keys().await?;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match self.store.get(&key).await {
                Ok(Some(value)) => value,
                Ok(None) => NULL_MARKER.to_string(),
                Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
                Err(e) => {
                    debug!(key = %key, error = %e, "unreadable cache entry");
                    NULL_MARKER.to_string()
                }
            };
            entries.push(CacheEntry { key, value });
        }
        Ok(entries)
    }

    // == Get Entry ==
    pub async fn get_entry(&self, key: &str) -> Result<CacheEntry> {
        self.ensure_available().await?;

        match self.store.get(key).await? {
            Some(value) => Ok(CacheEntry {
                key: key.to_string(),
                value,
            }),
            None => Err(CacheError::EntryNotFound(key.to_string())),
        }
    }

    // == Delete Entry ==
    /// Deleting an absent key succeeds.
    pub async fn delete_entry(&self, key: &str) -> Result<()> {
        self.ensure_available().await?;

        let removed = self.store.delete(key).await?;
        debug!(key = %key, removed, "cache entry deleted");
        Ok(())
    }

    // == Clear All ==
    /// Deletes every key in the namespace. Not atomic with concurrent writers.
    ///
    /// Returns the number of entries removed.
    pub async fn clear_all(&self) -> Result<usize> {
        self.ensure_available().await?;

        let mut removed = 0;
        for key in self.caller_keys().await? {
            if self.store.delete(&key).await? {
                removed += 1;
            }
        }
        info!(removed, "cache cleared");
        Ok(removed)
    }
}
