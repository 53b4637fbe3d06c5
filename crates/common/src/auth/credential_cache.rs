//! In-memory credential cache keyed by `(account, role, session)`

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use courier_domain::{CacheKey, Credential};
use tracing::trace;

use crate::cache::{Cache, CacheConfig, CacheStats, EvictionPolicy};
use crate::resilience::{Clock, SharedClock, SystemClock};

/// Process-wide credential cache.
///
/// Entries expire at the credential's own `expires_at`, so [`get`] never
/// returns an expired credential. Staleness is checked on read; there is no
/// background sweep. Expired entries stay readable through [`peek_stale`]
/// until replaced or taken, so their refresh token remains usable. Clones
/// share storage.
///
/// [`get`]: CredentialCache::get
/// [`peek_stale`]: CredentialCache::peek_stale
#[derive(Clone)]
pub struct CredentialCache {
    inner: Cache<CacheKey, Stored, SharedClock>,
    clock: SharedClock,
}

#[derive(Debug, Clone)]
struct Stored {
    credential: Credential,
    stored_at: DateTime<Utc>,
}

impl CredentialCache {
    /// Unbounded cache on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), None)
    }

    /// Cache on `clock`, optionally bounded to `max_entries` (LRU).
    pub fn with_clock(clock: SharedClock, max_entries: Option<usize>) -> Self {
        let policy = if max_entries.is_some() { EvictionPolicy::LRU } else { EvictionPolicy::None };
        let config = CacheConfig::builder()
            .max_size_opt(max_entries)
            .eviction_policy(policy)
            .track_metrics(true)
            .build();
        Self { inner: Cache::with_clock(config, Arc::clone(&clock)), clock }
    }

    /// Live credential for `key`, or `None` if absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<Credential> {
        self.get_with_lifetime(key).map(|(credential, _)| credential)
    }

    /// Live credential for `key` together with the validity it had when
    /// stored (`expires_at` minus the time of [`put`](Self::put)).
    pub fn get_with_lifetime(&self, key: &CacheKey) -> Option<(Credential, ChronoDuration)> {
        let now = self.clock.utc_now();
        let hit = self.inner.get(key).filter(|stored| stored.credential.expires_at > now);
        trace!(cache_key = %key, hit = hit.is_some(), "Credential cache lookup");
        hit.map(|stored| {
            let lifetime = stored.credential.expires_at - stored.stored_at;
            (stored.credential, lifetime)
        })
    }

    /// Stored credential for `key` whether or not it has expired. Does not
    /// remove anything.
    pub fn peek_stale(&self, key: &CacheKey) -> Option<Credential> {
        self.inner.get(key).map(|stored| stored.credential)
    }

    /// Store or overwrite the credential for `key`.
    pub fn put(&self, key: CacheKey, credential: Credential) {
        let stored = Stored { credential, stored_at: self.clock.utc_now() };
        self.inner.insert(key, stored);
    }

    /// Remove and return the stored credential, even if it has expired.
    pub fn take(&self, key: &CacheKey) -> Option<Credential> {
        self.inner.remove(key).map(|stored| stored.credential)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.stats()
    }

    /// Clock used for expiry decisions.
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc_now()
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache").field("inner", &self.inner).finish_non_exhaustive()
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new()
    }
}
