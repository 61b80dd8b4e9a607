//! Bounded time-to-live cache shared by all conversations.
//!
//! Expired entries are purged lazily when read. When an insert would exceed capacity the
//! oldest-inserted entry is evicted regardless of its remaining TTL. Reads use `peek`, so
//! they never refresh an entry's position.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default capacity when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Thread-safe TTL cache. Clone values out; nothing is handed out by reference.
#[derive(Debug)]
pub struct TtlCache<V> {
    capacity: NonZeroUsize,
    inner: Mutex<LruCache<String, (V, Instant)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity,
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, (V, Instant)>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the value if present and not expired. An expired entry is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut cache = self.lock();
        let expired = match cache.peek(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => return Some(value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            cache.pop(key);
            tracing::trace!(target: "herald::cache", key, "expired entry purged on read");
        }
        None
    }

    /// Inserts `value` for `ttl`. A zero TTL is rejected (the entry could never be read),
    /// returning `false`.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) -> bool {
        if ttl.is_zero() {
            tracing::debug!(target: "herald::cache", "rejecting put with zero ttl");
            return false;
        }
        let key = key.into();
        let mut cache = self.lock();
        // Re-inserting moves the key to the newest slot.
        cache.pop(&key);
        if let Some((evicted, _)) = cache.push(key, (value, Instant::now() + ttl)) {
            tracing::trace!(target: "herald::cache", key = %evicted, "evicted oldest entry");
        }
        true
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().pop(key).map(|(value, _)| value)
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drops every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut cache = self.lock();
        let now = Instant::now();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, (_, expires_at))| *expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        expired.len()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn round_trip_before_ttl() {
        let cache = TtlCache::new(4);
        assert!(cache.put("k", 7u32, Duration::from_secs(60)));
        assert_eq!(cache.get("k"), Some(7));
    }

    #[test]
    fn miss_after_ttl_and_purged() {
        let cache = TtlCache::new(4);
        cache.put("k", "v".to_string(), Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let cache = TtlCache::new(4);
        assert!(!cache.put("k", 1u8, Duration::ZERO));
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_oldest_inserted_not_least_recently_read() {
        let cache = TtlCache::new(2);
        cache.put("a", 1, Duration::from_secs(60));
        cache.put("b", 2, Duration::from_secs(60));
        // Reading "a" must not protect it.
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3, Duration::from_secs(60));
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn overwrite_counts_as_fresh_insertion() {
        let cache = TtlCache::new(2);
        cache.put("a", 1, Duration::from_secs(60));
        cache.put("b", 2, Duration::from_secs(60));
        cache.put("a", 10, Duration::from_secs(60));
        cache.put("c", 3, Duration::from_secs(60));
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_writers_keep_capacity() {
        let cache = Arc::new(TtlCache::new(16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let key = format!("{t}-{i}");
                        cache.put(key.clone(), i, Duration::from_secs(60));
                        if let Some(v) = cache.get(&key) {
                            assert_eq!(v, i);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(cache.len() <= 16);
    }

    #[test]
    fn purge_drops_only_expired() {
        let cache = TtlCache::new(4);
        cache.put("short", 1, Duration::from_millis(10));
        cache.put("long", 2, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
