//! Core cache implementation
//!
//! Entries can go stale two ways: the cache-wide TTL (monotonic, measured
//! from insertion) and an optional wall-clock deadline attached to the entry
//! itself. Either one makes the entry invisible to readers; stale entries are
//! dropped lazily on access or through [`Cache::cleanup_expired`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::config::{CacheConfig, EvictionPolicy};
use super::stats::{CacheStats, MetricsCollector};
use crate::resilience::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    expires_at: Option<DateTime<Utc>>,
    /// Logical access tick; lowest is least recently used.
    last_access: u64,
}

#[derive(Debug)]
struct CacheStorage<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    tick: u64,
}

impl<K, V> CacheStorage<K, V> {
    fn new() -> Self {
        Self { entries: HashMap::new(), tick: 0 }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Generic thread-safe cache
///
/// # Type Parameters
/// - `K`: Key type (must be `Eq + Hash + Clone`)
/// - `V`: Value type (must be `Clone`)
/// - `C`: Clock used for TTL and expiry decisions (defaults to `SystemClock`)
///
/// Clones share storage and metrics.
///
/// # Example
/// ```
/// use courier_common::cache::{Cache, CacheConfig};
///
/// let cache: Cache<String, i32> = Cache::new(CacheConfig::lru(100));
/// cache.insert("key".to_string(), 42);
/// assert_eq!(cache.get(&"key".to_string()), Some(42));
/// ```
pub struct Cache<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    storage: Arc<RwLock<CacheStorage<K, V>>>,
    config: CacheConfig,
    metrics: MetricsCollector,
    clock: C,
}

impl<K, V> Cache<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new cache with the given configuration using system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<K, V, C> Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    pub fn with_clock(config: CacheConfig, clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(CacheStorage::new())),
            config,
            metrics: MetricsCollector::new(),
            clock,
        }
    }

    /// Insert a value with no deadline of its own.
    pub fn insert(&self, key: K, value: V) {
        self.insert_entry(key, value, None);
    }

    /// Insert a value that becomes invisible once `expires_at` passes.
    pub fn insert_with_expiry(&self, key: K, value: V, expires_at: DateTime<Utc>) {
        self.insert_entry(key, value, Some(expires_at));
    }

    fn insert_entry(&self, key: K, value: V, expires_at: Option<DateTime<Utc>>) {
        let mut storage = self.storage.write();

        if let Some(max_size) = self.config.max_size {
            if storage.entries.len() >= max_size && !storage.entries.contains_key(&key) {
                self.evict_one(&mut storage);
            }
        }

        let last_access = storage.next_tick();
        let entry = CacheEntry { value, inserted_at: self.clock.now(), expires_at, last_access };
        storage.entries.insert(key, entry);

        if self.config.track_metrics {
            self.metrics.record_insert();
        }
    }

    /// Get a live value from the cache.
    ///
    /// Returns `None` if the key is absent, past the TTL, or past its own
    /// deadline. Stale entries are removed on the way out.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut storage = self.storage.write();

        let stale = match storage.entries.get(key) {
            None => {
                self.record_miss();
                return None;
            }
            Some(entry) => self.is_stale(entry),
        };

        if stale {
            storage.entries.remove(key);
            if self.config.track_metrics {
                self.metrics.record_miss();
                self.metrics.record_expiration();
            }
            return None;
        }

        let tick = storage.next_tick();
        let entry = storage.entries.get_mut(key)?;
        entry.last_access = tick;
        let value = entry.value.clone();

        if self.config.track_metrics {
            self.metrics.record_hit();
        }
        Some(value)
    }

    /// Return the cached value or insert the one produced by `f`.
    pub fn get_or_insert_with<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = f();
        self.insert(key, value.clone());
        value
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.storage.read().entries.get(key).is_some_and(|entry| !self.is_stale(entry))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.storage.write().entries.remove(key).map(|e| e.value)
    }

    /// Remove every entry and reset metrics.
    pub fn clear(&self) {
        self.storage.write().entries.clear();

        if self.config.track_metrics {
            self.metrics.reset();
        }
    }

    /// Number of stored entries, stale ones included until they are swept.
    pub fn len(&self) -> usize {
        self.storage.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove stale entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut storage = self.storage.write();
        let before = storage.entries.len();
        storage.entries.retain(|_, entry| !self.is_stale(entry));
        let removed = before - storage.entries.len();

        if self.config.track_metrics {
            for _ in 0..removed {
                self.metrics.record_expiration();
            }
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot(self.len(), self.config.max_size)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn is_stale(&self, entry: &CacheEntry<V>) -> bool {
        if let Some(ttl) = self.config.ttl {
            if self.clock.now().duration_since(entry.inserted_at) >= ttl {
                return true;
            }
        }
        entry.expires_at.is_some_and(|deadline| self.clock.utc_now() >= deadline)
    }

    fn record_miss(&self) {
        if self.config.track_metrics {
            self.metrics.record_miss();
        }
    }

    fn evict_one(&self, storage: &mut CacheStorage<K, V>) {
        let victim = match self.config.eviction_policy {
            EvictionPolicy::LRU => storage
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(key, _)| key.clone()),
            EvictionPolicy::None => None,
        };

        if let Some(key) = victim {
            storage.entries.remove(&key);
            if self.config.track_metrics {
                self.metrics.record_eviction();
            }
        }
    }
}

impl<K, V, C> Clone for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            clock: self.clock.clone(),
        }
    }
}

impl<K, V, C> std::fmt::Debug for Cache<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("len", &self.storage.read().entries.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
