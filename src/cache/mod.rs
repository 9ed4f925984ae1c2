//! Cache Module
//!
//! Cache-aside orchestration, store health monitoring and the administrative
//! introspection service.

mod aside;
mod health;
mod introspection;
mod single_flight;


// Re-export public types
pub use aside::{CacheAside, CacheLookup, CacheSettings};
pub use health::HealthMonitor;
pub use introspection::{CacheEntry, CacheIntrospection, CacheStatus, NULL_MARKER};
pub use single_flight::{InFlight, InFlightGuard};
