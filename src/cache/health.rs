//! Connection Health Monitor
//!
//! Collapses the store's connectivity probe into a plain yes/no.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::store::KvStore;

/// Probes the store on every call; availability is never cached.
#[derive(Clone)]
pub struct HealthMonitor {
    store: Arc<dyn KvStore>,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(store: Arc<dyn KvStore>, probe_timeout: Duration) -> Self {
        Self {
            store,
            probe_timeout,
        }
    }

    /// Returns true only if a fresh probe succeeds within the probe timeout.
    pub async fn is_available(&self) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.store.ping()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(error = %e, "store probe failed");
                false
            }
            Err(_) => {
                debug!(timeout_ms = self.probe_timeout.as_millis() as u64, "store probe timed out");
                false
            }
        }
    }
}
