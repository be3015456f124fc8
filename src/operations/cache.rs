//! Bounded lookup caches for the operation registry.
//!
//! Entries are evicted least-recently-used first. The registry is responsible
//! for invalidating entries when the data behind them changes.

use crate::core::config::MAX_CACHE_CAPACITY;
use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries dropped by invalidation.
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate hit ratio.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 0.0;
        }
        self.hits as f64 / total as f64
    }
}

/// Thread-safe LRU cache with hit/miss accounting.
pub struct LookupCache<K: Hash + Eq, V: Clone> {
    cache: Mutex<LruCache<K, V>>,
    stats: Mutex<CacheStats>,
}

impl<K: Hash + Eq, V: Clone> LookupCache<K, V> {
    /// Create a cache holding at most `capacity` entries, clamped to
    /// `1..=MAX_CACHE_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.min(MAX_CACHE_CAPACITY)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    /// Get a cached value, marking it most recently used.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.cache.lock();
        let found = cache.get(key).cloned();
        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    /// Store a value.
    pub fn put(&self, key: K, value: V) {
        self.cache.lock().put(key, value);
    }

    /// Drop one entry.
    pub fn invalidate(&self, key: &K) {
        if self.cache.lock().pop(key).is_some() {
            self.stats.lock().invalidations += 1;
        }
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut cache = self.cache.lock();
        let dropped = cache.len() as u64;
        cache.clear();
        self.stats.lock().invalidations += dropped;
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_put_get() {
        let cache: LookupCache<String, u32> = LookupCache::new(4);
        assert!(cache.get(&"a".to_string()).is_none());
        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lru_eviction() {
        let cache: LookupCache<u32, u32> = LookupCache::new(2);
        cache.put(1, 10);
        cache.put(2, 20);
        // touch 1 so 2 becomes least recently used
        cache.get(&1);
        cache.put(3, 30);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(30));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache: LookupCache<u32, u32> = LookupCache::new(8);
        cache.put(1, 10);
        cache.put(2, 20);
        cache.invalidate(&1);
        cache.invalidate(&99);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache: LookupCache<u32, u32> = LookupCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_huge_capacity_is_clamped() {
        let cache: LookupCache<u32, u32> = LookupCache::new(usize::MAX);
        assert_eq!(cache.capacity(), MAX_CACHE_CAPACITY);
    }
}
