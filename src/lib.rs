//! Cache Aside - a cache-aside layer in front of a slower source of truth
//!
//! Reads populate the cache transparently, writes invalidate it, and every
//! cache failure degrades to the authoritative path. An administrative API
//! exposes the cache contents for inspection.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod products;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheAside, CacheIntrospection, CacheSettings, HealthMonitor};
pub use config::Config;
pub use store::{KeyPrefix, KvStore, MemoryStore, RedisStore};
pub use tasks::spawn_cleanup_task;
