//! Redis Store Module
//!
//! `KvStore` over a single shared Redis `ConnectionManager`.
//!
//! Entries are hashes `{data, sldexp}` carrying their own sliding window so a
//! read can push the expiry forward again. Keys are enumerated with `SCAN`.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use ::redis::{aio::ConnectionManager, Client, RedisError, RedisResult};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{KeyPrefix, KvStore};
use crate::config::Config;
use crate::error::StoreError;

const DATA_FIELD: &str = "data";
const SLIDING_FIELD: &str = "sldexp";
const SCAN_BATCH: usize = 250;

/// Connection parameters for the Redis backend.
#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub retry_interval: Duration,
    pub connect_retries: u32,
    pub operation_timeout: Duration,
}

impl RedisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.connection_string.clone(),
            connect_timeout: config.connect_timeout(),
            retry_interval: config.retry_interval(),
            connect_retries: config.connect_retries,
            operation_timeout: config.operation_timeout(),
        }
    }
}

#[derive(Default)]
struct ConnectionSlot {
    manager: Option<ConnectionManager>,
    last_attempt: Option<Instant>,
}

// == Redis Store ==
/// Redis-backed key-value store.
///
/// The process holds one `ConnectionManager`, cloned per command. If the
/// server is down at startup the store still comes up and retries lazily, at
/// most once per retry interval.
pub struct RedisStore {
    client: Client,
    settings: RedisSettings,
    prefix: KeyPrefix,
    connection: RwLock<ConnectionSlot>,
}

impl RedisStore {
    /// Builds the store and makes the initial connection attempts.
    ///
    /// Fails only when the connection string itself is invalid.
    pub async fn connect(settings: RedisSettings, prefix: KeyPrefix) -> Result<Self, StoreError> {
        let client = Client::open(settings.url.as_str())
            .map_err(|e| StoreError::Backend(format!("invalid connection string: {}", e)))?;

        let store = Self {
            client,
            settings,
            prefix,
            connection: RwLock::new(ConnectionSlot::default()),
        };

        let attempts = store.settings.connect_retries.max(1);
        for attempt in 1..=attempts {
            match store.open().await {
                Ok(manager) => {
                    info!(url = %store.settings.url, "Connected to Redis");
                    store.connection.write().await.manager = Some(manager);
                    return Ok(store);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Redis connection attempt failed");
                    if attempt < attempts {
                        tokio::time::sleep(store.settings.retry_interval).await;
                    }
                }
            }
        }

        warn!("Redis unreachable at startup, continuing without cache until it recovers");
        store.connection.write().await.last_attempt = Some(Instant::now());
        Ok(store)
    }

    async fn open(&self) -> Result<ConnectionManager, StoreError> {
        match tokio::time::timeout(
            self.settings.connect_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        {
            Ok(Ok(manager)) => Ok(manager),
            Ok(Err(e)) => Err(classify(e)),
            Err(_) => Err(StoreError::Unavailable("connect timed out".to_string())),
        }
    }

    /// Returns the shared connection, reconnecting if the retry interval allows.
    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        if let Some(manager) = self.connection.read().await.manager.as_ref() {
            return Ok(manager.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(manager) = slot.manager.as_ref() {
            return Ok(manager.clone());
        }
        if let Some(last) = slot.last_attempt {
            if last.elapsed() < self.settings.retry_interval {
                return Err(StoreError::Unavailable(
                    "waiting to retry Redis connection".to_string(),
                ));
            }
        }

        slot.last_attempt = Some(Instant::now());
        let manager = self.open().await?;
        info!(url = %self.settings.url, "Reconnected to Redis");
        slot.manager = Some(manager.clone());
        Ok(manager)
    }

    /// Runs one command against Redis, bounded by the operation timeout.
    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.settings.operation_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                debug!(op, error = %e, "Redis command failed");
                Err(classify(e))
            }
            Err(_) => Err(StoreError::Unavailable(format!("{} timed out", op))),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let raw = self.prefix.apply(key);
        let mut conn = self.connection().await?;
        self.run("HMGET", async move {
            let (data, sliding): (Option<String>, Option<u64>) = ::redis::cmd("HMGET")
                .arg(&raw)
                .arg(DATA_FIELD)
                .arg(SLIDING_FIELD)
                .query_async(&mut conn)
                .await?;

            if let (Some(_), Some(secs)) = (&data, sliding) {
                let _: () = ::redis::cmd("EXPIRE")
                    .arg(&raw)
                    .arg(secs)
                    .query_async(&mut conn)
                    .await?;
            }
            Ok::<_, RedisError>(data)
        })
        .await
    }

    async fn set(&self, key: &str, value: String, sliding: Duration) -> Result<(), StoreError> {
        let raw = self.prefix.apply(key);
        let secs = sliding.as_secs().max(1);
        let mut conn = self.connection().await?;
        self.run("HSET", async move {
            let written: RedisResult<()> = ::redis::pipe()
                .atomic()
                .cmd("DEL")
                .arg(&raw)
                .ignore()
                .cmd("HSET")
                .arg(&raw)
                .arg(DATA_FIELD)
                .arg(value)
                .arg(SLIDING_FIELD)
                .arg(secs)
                .ignore()
                .cmd("EXPIRE")
                .arg(&raw)
                .arg(secs)
                .ignore()
                .query_async(&mut conn)
                .await;
            written
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let raw = self.prefix.apply(key);
        let mut conn = self.connection().await?;
        self.run("DEL", async move {
            let removed: i64 = ::redis::cmd("DEL").arg(&raw).query_async(&mut conn).await?;
            Ok::<_, RedisError>(removed > 0)
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{}*", escape_glob(self.prefix.as_str()));
        let mut conn = self.connection().await?;
        self.run("SCAN", async move {
            let mut cursor: u64 = 0;
            let mut seen = HashSet::new();
            let mut keys = Vec::new();
            loop {
                let (next, batch): (u64, Vec<String>) = ::redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;

                // SCAN may yield a key more than once
                for key in batch {
                    if seen.insert(key.clone()) {
                        keys.push(key);
                    }
                }
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            Ok::<_, RedisError>(keys)
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.run("PING", async move {
            let _: String = ::redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, RedisError>(())
        })
        .await
    }

    fn key_prefix(&self) -> &KeyPrefix {
        &self.prefix
    }
}

/// Maps a Redis error onto the store taxonomy.
fn classify(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Escapes glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
