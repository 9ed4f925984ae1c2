//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Which key-value backend sits behind the cache layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Networked Redis server
    Redis,
    /// In-process store, useful for local runs and tests
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(BackendKind::Redis),
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Master switch for caching; when false the cache layer is a pass-through
    pub cache_enabled: bool,
    /// Backend used for cache storage
    pub backend: BackendKind,
    /// Redis connection string
    pub connection_string: String,
    /// Key prefix applied to every cache key (instance name)
    pub instance_name: String,
    /// Sliding expiration window in minutes
    pub cache_duration_minutes: u64,
    /// Coordinate concurrent misses on the same key
    pub single_flight: bool,
    /// Per-attempt connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Delay between connection attempts in milliseconds
    pub retry_interval_ms: u64,
    /// Number of connection attempts before giving up on a call
    pub connect_retries: u32,
    /// Upper bound for a single store command in milliseconds
    pub operation_timeout_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds (memory backend only)
    pub cleanup_interval: u64,
    /// Number of sample products seeded into the source of truth
    pub seed_count: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENABLED` - Enable caching, `true/false` or `1/0` (default: true)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `REDIS_CONNECTION_STRING` - Redis URL (default: redis://127.0.0.1:6379)
    /// - `REDIS_INSTANCE_NAME` - Key prefix (default: empty)
    /// - `CACHE_DURATION_MINUTES` - Sliding TTL in minutes (default: 5)
    /// - `CACHE_SINGLE_FLIGHT` - Coalesce concurrent misses (default: false)
    /// - `REDIS_CONNECT_TIMEOUT_MS` - Connect timeout (default: 2000)
    /// - `REDIS_RETRY_INTERVAL_MS` - Retry interval (default: 1000)
    /// - `REDIS_CONNECT_RETRIES` - Connect attempts (default: 3)
    /// - `REDIS_OPERATION_TIMEOUT_MS` - Command timeout (default: 2000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `SEED_PRODUCTS` - Sample products to seed (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_enabled: env_flag("CACHE_ENABLED").unwrap_or(defaults.cache_enabled),
            backend: parse_env("CACHE_BACKEND").unwrap_or(defaults.backend),
            connection_string: env::var("REDIS_CONNECTION_STRING")
                .unwrap_or(defaults.connection_string),
            instance_name: env::var("REDIS_INSTANCE_NAME").unwrap_or(defaults.instance_name),
            cache_duration_minutes: parse_env("CACHE_DURATION_MINUTES")
                .unwrap_or(defaults.cache_duration_minutes),
            single_flight: env_flag("CACHE_SINGLE_FLIGHT").unwrap_or(defaults.single_flight),
            connect_timeout_ms: parse_env("REDIS_CONNECT_TIMEOUT_MS")
                .unwrap_or(defaults.connect_timeout_ms),
            retry_interval_ms: parse_env("REDIS_RETRY_INTERVAL_MS")
                .unwrap_or(defaults.retry_interval_ms),
            connect_retries: parse_env("REDIS_CONNECT_RETRIES").unwrap_or(defaults.connect_retries),
            operation_timeout_ms: parse_env("REDIS_OPERATION_TIMEOUT_MS")
                .unwrap_or(defaults.operation_timeout_ms),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            seed_count: parse_env("SEED_PRODUCTS").unwrap_or(defaults.seed_count),
        }
    }

    /// Sliding expiration window as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_duration_minutes * 60)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            backend: BackendKind::Redis,
            connection_string: "redis://127.0.0.1:6379".to_string(),
            instance_name: String::new(),
            cache_duration_minutes: 5,
            single_flight: false,
            connect_timeout_ms: 2000,
            retry_interval_ms: 1000,
            connect_retries: 3,
            operation_timeout_ms: 2000,
            server_port: 3000,
            cleanup_interval: 1,
            seed_count: 600,
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    let parsed = raw.trim().parse().ok();
    if parsed.is_none() {
        warn!("Ignoring unparseable {}={:?}, using default", name, raw);
    }
    parsed
}

fn env_flag(name: &str) -> Option<bool> {
    let raw = env::var(name).ok()?;
    let parsed = parse_flag(&raw);
    if parsed.is_none() {
        warn!("Ignoring unparseable {}={:?}, using default", name, raw);
    }
    parsed
}

/// Accepts the usual spellings of a boolean switch, case-insensitively.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.cache_enabled);
        assert_eq!(config.backend, BackendKind::Redis);
        assert_eq!(config.cache_duration_minutes, 5);
        assert_eq!(config.connect_timeout_ms, 2000);
        assert_eq!(config.retry_interval_ms, 1000);
        assert_eq!(config.connect_retries, 3);
        assert_eq!(config.server_port, 3000);
        assert!(!config.single_flight);
        assert!(config.instance_name.is_empty());
    }

    #[test]
    fn test_cache_ttl_in_minutes() {
        let config = Config {
            cache_duration_minutes: 5,
            ..Config::default()
        };
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("redis".parse::<BackendKind>(), Ok(BackendKind::Redis));
        assert_eq!(" Memory ".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert!("memcached".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_parse_flag_common_forms() {
        for raw in ["true", "True", "1", " yes ", "ON"] {
            assert_eq!(parse_flag(raw), Some(true), "{}", raw);
        }
        for raw in ["false", "False", "0", "no", "off"] {
            assert_eq!(parse_flag(raw), Some(false), "{}", raw);
        }
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_env_flag_reads_numeric_switch() {
        // Owned by this test only
        env::set_var("CACHE_SINGLE_FLIGHT", "1");
        assert_eq!(env_flag("CACHE_SINGLE_FLIGHT"), Some(true));
        assert!(Config::from_env().single_flight);

        env::set_var("CACHE_SINGLE_FLIGHT", "nope");
        assert_eq!(env_flag("CACHE_SINGLE_FLIGHT"), None);
        assert!(!Config::from_env().single_flight);

        env::remove_var("CACHE_SINGLE_FLIGHT");
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Only clear variables this test owns; other tests never set them
        env::remove_var("CACHE_DURATION_MINUTES");
        env::remove_var("REDIS_CONNECT_RETRIES");
        env::remove_var("SEED_PRODUCTS");

        let config = Config::from_env();
        assert_eq!(config.cache_duration_minutes, 5);
        assert_eq!(config.connect_retries, 3);
        assert_eq!(config.seed_count, 600);
    }
}
