// ABOUTME: Bounded TTL cache with LRU eviction for source search and detail responses
// ABOUTME: Tracks hit, miss and eviction counters for health reporting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use nutrition_core::constants::cache::DEFAULT_CACHE_MAX_ENTRIES;
use serde::Serialize;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Counter snapshot for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that missed or found an expired entry
    pub misses: u64,
    /// Live entries at snapshot time
    pub entries: usize,
}

impl CacheStats {
    /// Hits over total lookups, zero when unused
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Async LRU cache whose entries expire after a fixed TTL
///
/// Entries are cloned out on read and never mutated in place.
#[derive(Debug)]
pub struct TtlCache<K: Hash + Eq, V> {
    store: Mutex<LruCache<K, CacheEntry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CACHE_MAX_ENTRIES) {
        Some(capacity) => capacity,
        None => NonZeroUsize::MIN,
    };

    /// Create a cache holding at most `capacity` entries for `ttl` each
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            store: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Entry lifetime
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry, dropping it if expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut store = self.store.lock().await;
        let cached = store
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone());
        if cached.is_none() {
            store.pop(key);
        }
        drop(store);
        let counter = if cached.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        cached
    }

    /// Insert or replace an entry
    pub async fn insert(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.store.lock().await.put(key, entry);
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }

    /// Counter snapshot
    pub async fn stats(&self) -> CacheStats {
        let entries = self.store.lock().await.len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hit_and_miss_counters() {
        let cache: TtlCache<String, u32> = TtlCache::new(4, Duration::from_secs(60));
        assert!(cache.get(&"rice".to_owned()).await.is_none());
        cache.insert("rice".to_owned(), 130).await;
        assert_eq!(cache.get(&"rice".to_owned()).await, Some(130));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache: TtlCache<u32, u32> = TtlCache::new(4, Duration::ZERO);
        cache.insert(1, 1).await;
        assert!(cache.get(&1).await.is_none());
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache: TtlCache<u32, u32> = TtlCache::new(2, Duration::from_secs(60));
        cache.insert(1, 1).await;
        cache.insert(2, 2).await;
        assert_eq!(cache.get(&1).await, Some(1));
        cache.insert(3, 3).await;
        assert!(cache.get(&2).await.is_none());
        assert_eq!(cache.get(&1).await, Some(1));
    }
}
