//! Response DTOs for the HTTP API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheEntry, CacheStatus};

/// A single cache entry (GET /api/rediscache/:key and list items)
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryResponse {
    pub key: String,
    pub value: String,
}

impl From<CacheEntry> for CacheEntryResponse {
    fn from(entry: CacheEntry) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
        }
    }
}

/// Response body for GET /api/rediscache/status
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusResponse {
    /// "Connected" or "Redis server down"
    pub status: String,
}

impl From<CacheStatus> for CacheStatusResponse {
    fn from(status: CacheStatus) -> Self {
        Self {
            status: status.label().to_string(),
        }
    }
}

/// Confirmation body for the cache delete endpoints
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn cleared(key: &str) -> Self {
        Self::new(format!("Cache entry '{}' cleared.", key))
    }

    pub fn all_cleared() -> Self {
        Self::new("All cache entries cleared.")
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
