//! Generic in-memory cache with TTL and per-entry expiry
//!
//! # Features
//!
//! - **Thread-safe**: `parking_lot::RwLock` around a `HashMap`
//! - **Generic**: any `K: Eq + Hash + Clone` and `V: Clone`
//! - **Two kinds of staleness**: a uniform TTL measured from insertion and an
//!   optional wall-clock deadline per entry; both are checked on read, no
//!   background sweep is needed
//! - **Optional bound**: LRU eviction once `max_size` entries exist
//! - **Metrics tracking**: hit/miss/eviction/expiration counters
//! - **Testable**: [`Clock`](crate::resilience::Clock) abstraction for
//!   deterministic time-based tests
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use courier_common::cache::{Cache, CacheConfig};
//!
//! let cache: Cache<String, i32> = Cache::new(CacheConfig::ttl(Duration::from_secs(60)));
//! cache.insert("key".to_string(), 42);
//! assert_eq!(cache.get(&"key".to_string()), Some(42));
//! ```

mod config;
mod core;
mod stats;

pub use core::Cache;

pub use config::{CacheConfig, CacheConfigBuilder, EvictionPolicy};
pub use stats::CacheStats;
