//! Cache configuration types and builder

use std::time::Duration;

/// What to do when a bounded cache is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the least recently accessed entry
    LRU,
    /// Never evict; inserts beyond `max_size` still succeed
    #[default]
    None,
}

/// Configuration for cache behavior
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries (None = unlimited)
    pub max_size: Option<usize>,

    /// Time-to-live measured from insertion (None = no TTL)
    pub ttl: Option<Duration>,

    pub eviction_policy: EvictionPolicy,

    pub track_metrics: bool,
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Unbounded cache; entries go stale only through their own deadline.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Quick preset for a TTL-based cache
    pub fn ttl(duration: Duration) -> Self {
        Self { ttl: Some(duration), ..Self::default() }
    }

    /// Quick preset for an LRU cache
    pub fn lru(max_size: usize) -> Self {
        Self { max_size: Some(max_size), eviction_policy: EvictionPolicy::LRU, ..Self::default() }
    }
}

/// Builder for CacheConfig with fluent API
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    #[must_use]
    pub const fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = Some(size);
        self
    }

    /// Bound the cache only when `size` is set.
    #[must_use]
    pub const fn max_size_opt(mut self, size: Option<usize>) -> Self {
        self.config.max_size = size;
        self
    }

    #[must_use]
    pub const fn ttl(mut self, duration: Duration) -> Self {
        self.config.ttl = Some(duration);
        self
    }

    #[must_use]
    pub const fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction_policy = policy;
        self
    }

    #[must_use]
    pub const fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}
