//! A small expiring key/value store.
//!
//! Entries are never evicted; expiry is checked lazily whenever an entry is read.
//! Memory therefore grows with the number of distinct keys for the lifetime of the
//! owner, which is acceptable for the per-station caches this backs.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) < self.ttl
    }
}

/// Key/value store whose entries are valid for a fixed time after insertion.
///
/// Uses the tokio clock, so tests can drive expiry with `tokio::time::pause`/`advance`.
/// The cache is not synchronized; owners serialize access (see [`crate::RequestCoalescer`]).
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    expiration_time: Duration,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(expiration_time: Duration) -> Self {
        Self {
            expiration_time,
            entries: HashMap::new(),
        }
    }

    pub fn expiration_time(&self) -> Duration {
        self.expiration_time
    }

    /// Stores `value` under `key` with the cache-wide expiration time.
    pub fn put(&mut self, key: K, value: V) {
        self.put_for(key, value, self.expiration_time);
    }

    /// Stores `value` under `key`, valid for `ttl` instead of the cache-wide expiration time.
    pub fn put_for(&mut self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// `false` when the key is absent or its entry has expired.
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(Instant::now()))
    }

    /// Returns the value only while it is fresh.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| &entry.value)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[tokio::test(start_paused = true)]
    async fn test_entry_is_fresh_until_expiration() {
        let mut cache = TtlCache::new(HOUR);
        cache.put("a".to_string(), 1);

        assert!(cache.has("a"));
        assert_eq!(cache.get("a"), Some(&1));

        tokio::time::advance(HOUR - Duration::from_millis(1)).await;
        assert!(cache.has("a"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!cache.has("a"));
        assert_eq!(cache.get("a"), None);
        // Expired entries are only hidden, never evicted.
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_for_overrides_ttl() {
        let mut cache: TtlCache<&str, Option<u32>> = TtlCache::new(HOUR);
        cache.put_for("negative", None, Duration::from_secs(60));
        cache.put("positive", Some(3));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!cache.has("negative"));
        assert!(cache.has("positive"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_refreshes_timestamp() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.put(7u32, "old");
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put(7u32, "new");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get(&7u32), Some(&"new"));
    }

    #[test]
    fn test_missing_key() {
        let cache: TtlCache<String, u8> = TtlCache::new(HOUR);
        assert!(!cache.has("nothing"));
        assert!(cache.is_empty());
    }
}
