//! Key-Value Store Module
//!
//! Abstraction over a remote, string-keyed, TTL-capable store plus the
//! backends that implement it.

mod entry;
mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

pub use entry::StoredEntry;
pub use memory::MemoryStore;
pub use self::redis::{RedisSettings, RedisStore};

// == Store Trait ==
/// A string-keyed store with sliding expiration.
///
/// Keys passed to `get`, `set` and `delete` are caller keys; the store applies
/// its [`KeyPrefix`] on the way in. `keys` returns the raw, prefixed form.
/// Implementations are shared by every in-flight operation and must be safe
/// for concurrent use.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a value. A successful read resets the entry's sliding TTL.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes a value with a sliding expiration window.
    async fn set(&self, key: &str, value: String, sliding: Duration) -> Result<(), StoreError>;

    /// Removes a value. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Enumerates raw keys within this store's prefix.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), StoreError>;

    fn key_prefix(&self) -> &KeyPrefix;
}

// == Key Prefix ==
/// Namespace string prepended to every key (the instance name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Maps a caller key into the store namespace.
    pub fn apply(&self, key: &str) -> String {
        format!("{}{}", self.0, key)
    }

    /// Maps a raw store key back to the caller's form.
    ///
    /// Only one leading occurrence is removed; keys outside the namespace are
    /// returned untouched.
    pub fn strip<'a>(&self, raw: &'a str) -> &'a str {
        raw.strip_prefix(self.0.as_str()).unwrap_or(raw)
    }

    /// Whether a raw key belongs to this namespace.
    pub fn owns(&self, raw: &str) -> bool {
        raw.starts_with(self.0.as_str())
    }
}
