//! Stored Entry Module
//!
//! Defines the structure for individual entries held by the in-memory store,
//! with sliding expiration.

use std::time::Duration;

use tokio::time::Instant;

// == Stored Entry ==
/// A single value plus its sliding expiration window.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// The stored (serialized) value
    pub value: String,
    /// Length of the sliding window
    pub sliding: Duration,
    /// Point in time the entry expires unless read again
    pub expires_at: Instant,
}

impl StoredEntry {
    // == Constructor ==
    /// Creates a new entry expiring `sliding` from now.
    pub fn new(value: String, sliding: Duration) -> Self {
        Self {
            value,
            sliding,
            expires_at: Instant::now() + sliding,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches the expiration time.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    // == Touch ==
    /// Resets the sliding window, as done on every successful read.
    pub fn touch(&mut self) {
        self.expires_at = Instant::now() + self.sliding;
    }
}
