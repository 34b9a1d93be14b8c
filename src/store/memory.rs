use crate::core::cache::{Cache, CacheEntry, CacheLookup, Clock};
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory TTL cache keyed by holding identity.
///
/// Entries are never evicted: an expired entry is reported as stale and kept
/// until a successful refetch replaces it. Memory is bounded by the number of
/// distinct keys ever stored.
pub struct MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn lookup(&self, key: &K) -> CacheLookup<V> {
        let now = self.clock.now();
        let cache = self.inner.lock().await;
        match cache.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                debug!("Cache HIT for key: {:?}", key);
                CacheLookup::Fresh(entry.clone())
            }
            Some(entry) => {
                debug!("Cache entry expired for key: {:?}", key);
                CacheLookup::Stale(entry.clone())
            }
            None => {
                debug!("Cache MISS for key: {:?}", key);
                CacheLookup::Missing
            }
        }
    }

    async fn put(&self, key: K, value: V) -> CacheEntry<V> {
        let fetched_at = self.clock.now();
        let entry = CacheEntry {
            value,
            fetched_at,
            expires_at: fetched_at + self.ttl,
        };

        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, entry.clone());
        entry
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::ManualClock;

    fn cache_with_clock(ttl_secs: i64) -> (MemoryCache<String, i32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let cache = MemoryCache::new(Duration::seconds(ttl_secs), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_cache_get_put() {
        let (cache, _clock) = cache_with_clock(10);

        // Initially, cache is empty
        assert_eq!(cache.lookup(&"key1".to_string()).await, CacheLookup::Missing);
        assert!(cache.is_empty().await);

        let stored = cache.put("key1".to_string(), 123).await;
        assert_eq!(stored.expires_at - stored.fetched_at, cache.ttl());
        match cache.lookup(&"key1".to_string()).await {
            CacheLookup::Fresh(entry) => assert_eq!(entry, stored),
            other => panic!("Expected a fresh entry, got {other:?}"),
        }

        assert_eq!(cache.lookup(&"key2".to_string()).await, CacheLookup::Missing);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration_keeps_last_value() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("key1".to_string(), 123).await;

        clock.advance(Duration::seconds(5));
        assert!(matches!(
            cache.lookup(&"key1".to_string()).await,
            CacheLookup::Fresh(CacheEntry { value: 123, .. })
        ));

        // Expiry is exclusive: at exactly the TTL the entry is stale
        clock.advance(Duration::seconds(5));
        assert!(matches!(
            cache.lookup(&"key1".to_string()).await,
            CacheLookup::Stale(CacheEntry { value: 123, .. })
        ));

        clock.advance(Duration::seconds(60));
        assert!(matches!(
            cache.lookup(&"key1".to_string()).await,
            CacheLookup::Stale(CacheEntry { value: 123, .. })
        ));
    }

    #[tokio::test]
    async fn test_put_supersedes_previous_entry() {
        let (cache, clock) = cache_with_clock(10);
        cache.put("key1".to_string(), 1).await;
        clock.advance(Duration::seconds(11));

        let replaced = cache.put("key1".to_string(), 2).await;
        assert_eq!(replaced.expires_at, clock.now() + Duration::seconds(10));
        assert!(matches!(
            cache.lookup(&"key1".to_string()).await,
            CacheLookup::Fresh(CacheEntry { value: 2, .. })
        ));
        assert_eq!(cache.len().await, 1);
    }
}
