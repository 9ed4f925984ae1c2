//! Cache-Aside Orchestrator
//!
//! Read-through population and best-effort invalidation over a `KvStore`.
//! Every failure that originates in the cache is absorbed here; only loader
//! failures reach the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::single_flight::InFlight;
use crate::config::Config;
use crate::error::StoreError;
use crate::store::KvStore;

/// JSON encoding of an absent value; never written to the store.
const ABSENT: &str = "null";

// == Cache Settings ==
/// Cache behaviour fixed at startup.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// When false, reads go straight to the loader and invalidation is a no-op
    pub enabled: bool,
    /// Sliding expiration applied to every write
    pub ttl: Duration,
    /// Coalesce concurrent misses on the same key
    pub single_flight: bool,
}

impl CacheSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.cache_enabled,
            ttl: config.cache_ttl(),
            single_flight: config.single_flight,
        }
    }
}

// == Cache Lookup ==
/// Outcome of reading a key from the store.
#[derive(Debug)]
pub enum CacheLookup<T> {
    /// Entry present and decoded
    Hit(T),
    /// Entry absent, empty or undecodable
    Miss,
    /// Store could not be read
    Unavailable(StoreError),
}

// == Cache Aside ==
/// The `get_or_set` / `invalidate` engine.
///
/// Cheap to clone; clones share the store connection and in-flight registry.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn KvStore>,
    settings: CacheSettings,
    in_flight: Option<InFlight>,
}

impl CacheAside {
    pub fn new(store: Arc<dyn KvStore>, settings: CacheSettings) -> Self {
        let in_flight = settings.single_flight.then(InFlight::new);
        Self {
            store,
            settings,
            in_flight,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, or runs `loader` and caches its result.
    ///
    /// `loader` runs at most once. A value that serializes to `null` is
    /// returned but not cached. Store and (de)serialization failures fall back
    /// to the loader; a loader error is returned unchanged.
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.settings.enabled {
            return loader().await;
        }

        let mut looked = self.lookup::<T>(key).await;

        // Only misses queue on the key; hits and outages never wait
        let missed = matches!(looked, CacheLookup::Miss);
        let guard = match &self.in_flight {
            Some(in_flight) if missed => {
                let guard = in_flight.acquire(key).await;
                // Whoever held the key before us may have populated it
                looked = self.lookup::<T>(key).await;
                Some(guard)
            }
            _ => None,
        };

        match looked {
            CacheLookup::Hit(value) => {
                debug!(key = %key, "cache hit");
                Ok(value)
            }
            CacheLookup::Miss => {
                debug!(key = %key, "cache miss");
                let value = loader().await?;
                self.populate(key, &value).await;
                Ok(value)
            }
            CacheLookup::Unavailable(e) => {
                drop(guard);
                warn!(key = %key, error = %e, "cache read failed, bypassing cache");
                loader().await
            }
        }
    }

    // == Lookup ==
    /// Reads and decodes `key`. Decoding failures count as a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> CacheLookup<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) if !raw.is_empty() => match serde_json::from_str(&raw) {
                Ok(value) => CacheLookup::Hit(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    CacheLookup::Miss
                }
            },
            Ok(_) => CacheLookup::Miss,
            Err(e) => CacheLookup::Unavailable(e),
        }
    }

    /// Best-effort write of a freshly loaded value.
    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "cannot serialize value, skipping cache write");
                return;
            }
        };
        if payload == ABSENT {
            return;
        }

        match self.store.set(key, payload, self.settings.ttl).await {
            Ok(()) => debug!(key = %key, ttl_secs = self.settings.ttl.as_secs(), "cache populated"),
            Err(e) => warn!(key = %key, error = %e, "cache write failed"),
        }
    }

    // == Invalidate ==
    /// Deletes `key` from the store. Never fails.
    ///
    /// Call only after the authoritative write has completed.
    pub async fn invalidate(&self, key: &str) {
        if !self.settings.enabled {
            return;
        }

        match self.store.delete(key).await {
            Ok(removed) => debug!(key = %key, removed, "cache invalidated"),
            Err(e) => warn!(key = %key, error = %e, "cache invalidation failed"),
        }
    }

    /// Invalidates several keys concurrently; each delete is independent.
    pub async fn invalidate_many<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        join_all(
            keys.into_iter()
                .map(|key| async move { self.invalidate(key.as_ref()).await }),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeyPrefix, MemoryStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(300);

    fn settings(enabled: bool, single_flight: bool) -> CacheSettings {
        CacheSettings {
            enabled,
            ttl: TTL,
            single_flight,
        }
    }

    fn cache_with(enabled: bool) -> (CacheAside, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(KeyPrefix::default()));
        let cache = CacheAside::new(store.clone(), settings(enabled, false));
        (cache, store)
    }

    /// Reads succeed with nothing cached; every write fails.
    struct ReadOnlyStore {
        prefix: KeyPrefix,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KvStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
        async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("READONLY".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Backend("READONLY".into()))
        }
        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
        fn key_prefix(&self) -> &KeyPrefix {
            &self.prefix
        }
    }

    #[tokio::test]
    async fn test_cold_read_populates_and_later_reads_hit() {
        let (cache, store) = cache_with(true);

        let first: Result<Vec<i32>, String> = cache.get_or_set("k", || async { Ok(vec![1]) }).await;
        let second: Result<Vec<i32>, String> =
            cache.get_or_set("k", || async { Ok(vec![2]) }).await;

        assert_eq!(first.unwrap(), vec![1]);
        assert_eq!(second.unwrap(), vec![1]);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn test_all_products_scenario() {
        let (cache, _store) = cache_with(true);
        let three = vec!["a", "b", "c"];
        let five = vec!["a", "b", "c", "d", "e"];

        let first: Vec<String> = cache
            .get_or_set("all_products", || async {
                Ok::<_, String>(three.iter().map(|s| s.to_string()).collect())
            })
            .await
            .unwrap();
        assert_eq!(first.len(), 3);

        let second: Vec<String> = cache
            .get_or_set("all_products", || async {
                Ok::<_, String>(five.iter().map(|s| s.to_string()).collect())
            })
            .await
            .unwrap();
        assert_eq!(second.len(), 3);

        cache.invalidate("all_products").await;

        let third: Vec<String> = cache
            .get_or_set("all_products", || async {
                Ok::<_, String>(five.iter().map(|s| s.to_string()).collect())
            })
            .await
            .unwrap();
        assert_eq!(third.len(), 5);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_loads_and_never_touches_store() {
        let (cache, store) = cache_with(false);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: u32 = cache
                .get_or_set("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(store.is_empty().await);

        store.set("k", "1".to_string(), TTL).await.unwrap();
        cache.invalidate("k").await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unreachable_store_falls_back_to_loader_once() {
        let (cache, store) = cache_with(true);
        store.set_reachable(false);
        let calls = AtomicUsize::new(0);

        let value: String = cache
            .get_or_set("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>("fresh".to_string())
            })
            .await
            .unwrap();

        assert_eq!(value, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Completes silently
        cache.invalidate("k").await;

        store.set_reachable(true);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_a_miss() {
        let (cache, store) = cache_with(true);
        store.set("k", "{not json".to_string(), TTL).await.unwrap();

        let value: Vec<u8> = cache
            .get_or_set("k", || async { Ok::<_, String>(vec![4, 2]) })
            .await
            .unwrap();

        assert_eq!(value, vec![4, 2]);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("[4,2]"));
    }

    #[tokio::test]
    async fn test_empty_entry_is_a_miss() {
        let (cache, store) = cache_with(true);
        store.set("k", String::new(), TTL).await.unwrap();

        let value: u8 = cache.get_or_set("k", || async { Ok::<_, String>(9) }).await.unwrap();
        assert_eq!(value, 9);
    }

    #[tokio::test]
    async fn test_absent_value_is_returned_but_not_cached() {
        let (cache, store) = cache_with(true);

        let value: Option<u32> = cache
            .get_or_set("Product_404", || async { Ok::<_, String>(None) })
            .await
            .unwrap();

        assert_eq!(value, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_loader_error_propagates_unchanged() {
        let (cache, store) = cache_with(true);

        let result: Result<u32, String> = cache
            .get_or_set("k", || async { Err("db offline".to_string()) })
            .await;

        assert_eq!(result, Err("db offline".to_string()));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_failure_returns_value_without_reloading() {
        let store = Arc::new(ReadOnlyStore {
            prefix: KeyPrefix::default(),
            writes: AtomicUsize::new(0),
        });
        let cache = CacheAside::new(store.clone(), settings(true, false));
        let calls = AtomicUsize::new(0);

        let value: u32 = cache
            .get_or_set("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(5)
            })
            .await
            .unwrap();

        assert_eq!(value, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);

        // Delete failures are swallowed as well
        cache.invalidate("k").await;
    }

    #[tokio::test]
    async fn test_invalidate_many_removes_each_key() {
        let (cache, store) = cache_with(true);
        for key in ["Product_1", "GET_ALL_PRODUCTS", "other"] {
            store.set(key, "1".to_string(), TTL).await.unwrap();
        }

        cache
            .invalidate_many(["Product_1".to_string(), "GET_ALL_PRODUCTS".to_string()])
            .await;

        assert_eq!(store.get("Product_1").await.unwrap(), None);
        assert_eq!(store.get("GET_ALL_PRODUCTS").await.unwrap(), None);
        assert!(store.get("other").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_idle_ttl() {
        let (cache, _store) = cache_with(true);

        let _: u32 = cache.get_or_set("k", || async { Ok::<_, String>(1) }).await.unwrap();
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        let value: u32 = cache.get_or_set("k", || async { Ok::<_, String>(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_single_flight_runs_loader_once_for_concurrent_misses() {
        let store = Arc::new(MemoryStore::new(KeyPrefix::default()));
        let cache = CacheAside::new(store, settings(true, true));
        let calls = AtomicUsize::new(0);

        let results = join_all((0..8).map(|_| {
            cache.get_or_set("hot", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(42u32)
            })
        }))
        .await;

        assert!(results.into_iter().all(|r| r == Ok(42)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Every read stalls for a while and then fails.
    struct StallingStore {
        prefix: KeyPrefix,
        stall: Duration,
    }

    #[async_trait]
    impl KvStore for StallingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            tokio::time::sleep(self.stall).await;
            Err(StoreError::Unavailable("timed out".into()))
        }
        async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("timed out".into()))
        }
        async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("timed out".into()))
        }
        async fn keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("timed out".into()))
        }
        fn key_prefix(&self) -> &KeyPrefix {
            &self.prefix
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_does_not_serialize_outage_fallbacks() {
        let stall = Duration::from_millis(100);
        let store = Arc::new(StallingStore {
            prefix: KeyPrefix::default(),
            stall,
        });
        let cache = CacheAside::new(store, settings(true, true));
        let calls = AtomicUsize::new(0);

        let started = tokio::time::Instant::now();
        let results = join_all((0..10).map(|_| {
            cache.get_or_set("hot", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(3u32)
            })
        }))
        .await;
        let elapsed = started.elapsed();

        assert!(results.into_iter().all(|r| r == Ok(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        // One stall shared by all callers, not one stall per caller
        assert!(elapsed < stall * 2, "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_single_flight_hits_skip_the_registry() {
        let store = Arc::new(MemoryStore::new(KeyPrefix::default()));
        store.set("hot", "5".to_string(), TTL).await.unwrap();
        let cache = CacheAside::new(store, settings(true, true));
        let in_flight = cache.in_flight.clone().unwrap();

        // A miss holding the key must not block readers of a cached value
        let _held = in_flight.acquire("hot").await;
        let value = tokio::time::timeout(
            Duration::from_secs(1),
            cache.get_or_set("hot", || async { Ok::<_, String>(0u32) }),
        )
        .await
        .expect("hit waited on the in-flight lock")
        .unwrap();

        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_without_single_flight_concurrent_misses_all_load() {
        let (cache, _store) = cache_with(true);
        let calls = AtomicUsize::new(0);

        let results = join_all((0..4).map(|_| {
            cache.get_or_set("hot", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, String>(1u32)
            })
        }))
        .await;

        assert_eq!(results.len(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
