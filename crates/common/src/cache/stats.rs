//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time view of cache activity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: Option<usize>,
    pub hits: u64,
    /// Absent or stale on read
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// hits / (hits + misses), or 0.0 before any read
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Lock-free counters shared by every clone of a cache.
#[derive(Debug, Clone, Default)]
pub(crate) struct MetricsCollector {
    counters: Arc<Counters>,
}

impl MetricsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.counters.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize, max_size: Option<usize>) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            size,
            max_size,
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            inserts: c.inserts.load(Ordering::Relaxed),
            evictions: c.evictions.load(Ordering::Relaxed),
            expirations: c.expirations.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        let c = &self.counters;
        for counter in [&c.hits, &c.misses, &c.inserts, &c.evictions, &c.expirations] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
