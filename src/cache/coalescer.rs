use crate::cache::ttl_cache::TtlCache;
use log::debug;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Single-flight access to a [`TtlCache`].
///
/// For any key at most one fetch is in flight: callers take a per-key lock, check the
/// cache while holding it, and only fetch on a miss. Concurrent callers for the same key
/// wait for the first one and then read its result from the cache. Different keys fetch
/// independently. Failed fetches are not cached.
///
/// Each coalescer owns its cache and its locks, so separate owners never contend.
#[derive(Debug)]
pub struct RequestCoalescer<V> {
    cache: Mutex<TtlCache<String, V>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<V: Clone> RequestCoalescer<V> {
    pub fn new(expiration_time: Duration) -> Self {
        Self {
            cache: Mutex::new(TtlCache::new(expiration_time)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its result.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_fetch_with_ttl(key, |_| None, fetch).await
    }

    /// Like [`Self::get_or_fetch`], but `ttl_for` may pick a custom lifetime for the
    /// fetched value (`None` keeps the cache-wide expiration time).
    pub async fn get_or_fetch_with_ttl<T, F, Fut, E>(
        &self,
        key: &str,
        ttl_for: T,
        fetch: F,
    ) -> Result<V, E>
    where
        T: FnOnce(&V) -> Option<Duration>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let key_lock = self.key_lock(key).await;
        let _guard = key_lock.lock().await;

        if let Some(cached) = self.cache.lock().await.get(key) {
            debug!("Cache hit for '{}'", key);
            return Ok(cached.clone());
        }

        debug!("Cache miss for '{}'", key);
        let value = fetch().await?;

        let mut cache = self.cache.lock().await;
        match ttl_for(&value) {
            Some(ttl) => cache.put_for(key.to_string(), value.clone(), ttl),
            None => cache.put(key.to_string(), value.clone()),
        }
        Ok(value)
    }

    /// `true` if a fresh entry exists for `key`.
    pub async fn is_cached(&self, key: &str) -> bool {
        self.cache.lock().await.has(key)
    }

    /// Number of entries in the underlying cache, expired ones included.
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        Arc::clone(
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
