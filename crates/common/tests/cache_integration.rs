//! Integration tests for the generic cache and the credential cache

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use courier_common::cache::{Cache, CacheConfig, EvictionPolicy};
use courier_common::resilience::{Clock, MockClock};

/// Validates a bounded TTL cache under concurrent writers.
///
/// Assertions:
/// - Confirms the bound holds after parallel inserts.
/// - Confirms every entry expires once the TTL elapses on the mock clock.
#[test]
fn bounded_ttl_cache_under_contention() {
    let clock = MockClock::new();
    let config = CacheConfig::builder()
        .max_size(50)
        .ttl(Duration::from_secs(30))
        .eviction_policy(EvictionPolicy::LRU)
        .track_metrics(true)
        .build();
    let cache: Cache<u32, u32, MockClock> = Cache::with_clock(config, clock.clone());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    cache.insert(t * 1000 + i, i);
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().expect("writer thread panicked");
    }

    assert_eq!(cache.len(), 50);
    assert_eq!(cache.stats().evictions, 350);

    clock.advance_secs(30);
    assert_eq!(cache.cleanup_expired(), 50);
    assert!(cache.is_empty());
}

/// Validates wall-clock deadlines follow the mock clock's UTC reading.
#[test]
fn entry_deadline_tracks_mock_wall_clock() {
    let clock = MockClock::new();
    let cache: Cache<&str, &str, Arc<MockClock>> =
        Cache::with_clock(CacheConfig::unbounded(), Arc::new(clock.clone()));
    cache.insert_with_expiry("k", "v", clock.utc_now() + chrono::Duration::minutes(5));

    clock.advance(Duration::from_secs(299));
    assert_eq!(cache.get(&"k"), Some("v"));
    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get(&"k"), None);
}

#[cfg(feature = "platform")]
mod credentials {
    use std::sync::Arc;

    use courier_common::auth::CredentialCache;
    use courier_common::resilience::{Clock, MockClock};
    use courier_domain::{CacheKey, Credential};

    /// Validates the `(account, role, session)` key isolates entries.
    #[test]
    fn keys_are_isolated_by_session() {
        let clock = MockClock::new();
        let cache = CredentialCache::with_clock(Arc::new(clock.clone()), None);
        let expiry = clock.utc_now() + chrono::Duration::hours(1);
        cache.put(CacheKey::new("111111111111", "Admin", "a"), Credential::new("a", expiry));
        cache.put(CacheKey::new("111111111111", "Admin", "b"), Credential::new("b", expiry));

        let a = cache.get(&CacheKey::new("111111111111", "Admin", "a")).expect("cached");
        assert_eq!(a.access_token, "a");
        assert!(cache.get(&CacheKey::new("111111111111", "Admin", "c")).is_none());
        assert_eq!(cache.len(), 2);
    }
}
