//! Memoization of computed CSS class names.
//!
//! Two implementations sit behind the [`ClassCache`] trait:
//!
//! - [`LruTtlCache`]: the preferred tier. Bounded by entry count and by an
//!   estimated byte size (key length plus two bytes per value character),
//!   evicting the least recently used entry first, with a time to live.
//! - [`FallbackMapCache`]: an unbounded map used when the bounded cache cannot
//!   be built from the given limits. It still honors the time to live.
//!
//! [`build_cache`] picks the tier and logs the captured error when it has to
//! fall back. A miss is never an error: callers recompute and `set`.
//!
//! Time is measured with `std::time::Instant`, so expiry is immune to wall-clock
//! changes. The `*_at` variants take the current instant explicitly.
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use board_common::{BoardError, Result};
use log::warn;

use crate::config::CacheConfig;

/// Which implementation backs a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    /// Bounded LRU with TTL.
    Bounded,
    /// Unbounded map with TTL.
    Fallback,
}

/// Key → class-name store shared by the worker and the store mirror.
pub trait ClassCache: Send {
    /// Value for `key` if present and younger than the TTL.
    fn get_at(&mut self, key: &str, now: Instant) -> Option<String>;
    /// Insert or overwrite `key`.
    fn set_at(&mut self, key: String, value: String, now: Instant);
    /// Drop every entry.
    fn clear(&mut self);
    /// Number of stored entries, expired ones included until they are touched.
    fn len(&self) -> usize;
    /// Backing implementation.
    fn tier(&self) -> CacheTier;

    /// `get_at` with the current instant.
    fn get(&mut self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    /// `set_at` with the current instant.
    fn set(&mut self, key: String, value: String) {
        self.set_at(key, value, Instant::now())
    }

    /// `true` when nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Estimated footprint of an entry: key bytes plus UTF-16 cost of the value.
pub fn entry_size(key: &str, value: &str) -> usize {
    key.len() + value.chars().count() * 2
}

struct Entry {
    value: String,
    stored_at: Instant,
    tick: u64,
    size: usize,
}

/// Bounded least-recently-used cache with a time to live.
pub struct LruTtlCache {
    entries: HashMap<String, Entry>,
    /// Recency order: smallest tick is the least recently used key.
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    size: usize,
    config: CacheConfig,
}

impl LruTtlCache {
    /// Build a cache; fails when a limit is zero.
    pub fn new(config: CacheConfig) -> Result<Self> {
        if config.max_items == 0 {
            return Err(BoardError::CacheConfig("max_items must be positive".into()));
        }
        if config.max_size == 0 {
            return Err(BoardError::CacheConfig("max_size must be positive".into()));
        }
        if config.ttl_ms == 0 {
            return Err(BoardError::CacheConfig("ttl_ms must be positive".into()));
        }
        Ok(Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            size: 0,
            config,
        })
    }

    /// Estimated size of all entries.
    pub fn size(&self) -> usize {
        self.size
    }

    fn bump(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        self.size -= entry.size;
        Some(entry)
    }

    fn evict_to_limits(&mut self) {
        while self.entries.len() > self.config.max_items || self.size > self.config.max_size {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.size -= entry.size;
            }
        }
    }
}

impl ClassCache for LruTtlCache {
    fn get_at(&mut self, key: &str, now: Instant) -> Option<String> {
        let ttl = self.config.ttl();
        let stored_at = self.entries.get(key)?.stored_at;
        if now.saturating_duration_since(stored_at) > ttl {
            self.remove(key);
            return None;
        }
        if !self.config.touch_on_read {
            return self.entries.get(key).map(|e| e.value.clone());
        }
        let tick = self.bump();
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.tick);
        self.recency.insert(tick, key.to_string());
        entry.tick = tick;
        entry.stored_at = now;
        Some(entry.value.clone())
    }

    fn set_at(&mut self, key: String, value: String, now: Instant) {
        self.remove(&key);
        let size = entry_size(&key, &value);
        if size > self.config.max_size {
            return;
        }
        let tick = self.bump();
        self.recency.insert(tick, key.clone());
        self.size += size;
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
                tick,
                size,
            },
        );
        self.evict_to_limits();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.size = 0;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn tier(&self) -> CacheTier {
        CacheTier::Bounded
    }
}

/// Unbounded map with a time to live; the degraded tier.
pub struct FallbackMapCache {
    entries: HashMap<String, (String, Instant)>,
    ttl: Duration,
}

impl FallbackMapCache {
    /// Map whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }
}

impl ClassCache for FallbackMapCache {
    fn get_at(&mut self, key: &str, now: Instant) -> Option<String> {
        let (value, stored_at) = self.entries.get(key)?;
        if now.saturating_duration_since(*stored_at) > self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(value.clone())
    }

    fn set_at(&mut self, key: String, value: String, now: Instant) {
        self.entries.insert(key, (value, now));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn tier(&self) -> CacheTier {
        CacheTier::Fallback
    }
}

/// Build the preferred bounded cache, or the unbounded fallback when `config`
/// cannot be honored. `label` names the cache in the warning.
pub fn build_cache(config: CacheConfig, label: &str) -> Box<dyn ClassCache> {
    match LruTtlCache::new(config) {
        Ok(cache) => Box::new(cache),
        Err(e) => {
            warn!("{} cache falls back to an unbounded map: {}", label, e);
            Box::new(FallbackMapCache::new(config.ttl()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_items: usize, max_size: usize, touch_on_read: bool) -> CacheConfig {
        CacheConfig {
            max_items,
            max_size,
            ttl_ms: 1000,
            touch_on_read,
        }
    }

    #[test]
    fn evicts_least_recently_inserted_over_capacity() {
        let mut cache = LruTtlCache::new(config(3, 10_000, true)).unwrap();
        for i in 0..4 {
            cache.set(format!("k{}", i), "text-red-600".into());
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get("k0"), None);
        assert!(cache.get("k3").is_some());
    }

    #[test]
    fn read_refreshes_recency_when_touching() {
        let mut cache = LruTtlCache::new(config(2, 10_000, true)).unwrap();
        cache.set("a".into(), "x".into());
        cache.set("b".into(), "y".into());
        assert_eq!(cache.get("a").as_deref(), Some("x"));
        cache.set("c".into(), "z".into());
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a").as_deref(), Some("x"));
    }

    #[test]
    fn read_does_not_refresh_without_touch() {
        let mut cache = LruTtlCache::new(config(2, 10_000, false)).unwrap();
        cache.set("a".into(), "x".into());
        cache.set("b".into(), "y".into());
        cache.get("a");
        cache.set("c".into(), "z".into());
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("b").is_some());
    }

    #[test]
    fn size_budget_evicts_before_item_limit() {
        // each entry: 2 key bytes + 2 * 4 value chars = 10
        let mut cache = LruTtlCache::new(config(100, 25, true)).unwrap();
        cache.set("k1".into(), "abcd".into());
        cache.set("k2".into(), "abcd".into());
        assert_eq!(cache.size(), 20);
        cache.set("k3".into(), "abcd".into());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.size(), 20);
    }

    #[test]
    fn oversized_entry_is_not_stored() {
        let mut cache = LruTtlCache::new(config(10, 8, true)).unwrap();
        cache.set("key".into(), "too long".into());
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn overwrite_replaces_size_accounting() {
        let mut cache = LruTtlCache::new(config(10, 1000, true)).unwrap();
        cache.set("k".into(), "ab".into());
        cache.set("k".into(), "abcd".into());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size(), entry_size("k", "abcd"));
    }

    #[test]
    fn expired_entries_are_misses() {
        let mut cache = LruTtlCache::new(config(10, 1000, false)).unwrap();
        let start = Instant::now();
        cache.set_at("k".into(), "v".into(), start);
        assert!(cache.get_at("k", start + Duration::from_millis(999)).is_some());
        assert_eq!(cache.get_at("k", start + Duration::from_millis(1001)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn touch_on_read_extends_age() {
        let mut cache = LruTtlCache::new(config(10, 1000, true)).unwrap();
        let start = Instant::now();
        cache.set_at("k".into(), "v".into(), start);
        assert!(cache.get_at("k", start + Duration::from_millis(800)).is_some());
        assert!(cache.get_at("k", start + Duration::from_millis(1600)).is_some());
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = LruTtlCache::new(config(10, 1000, true)).unwrap();
        cache.set("a".into(), "x".into());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn zero_limits_fall_back_to_unbounded_map() {
        let cache = build_cache(config(0, 1000, true), "test");
        assert_eq!(cache.tier(), CacheTier::Fallback);
        let cache = build_cache(config(10, 1000, true), "test");
        assert_eq!(cache.tier(), CacheTier::Bounded);
    }

    #[test]
    fn fallback_map_honors_ttl() {
        let mut cache = FallbackMapCache::new(Duration::from_millis(100));
        let start = Instant::now();
        for i in 0..5000 {
            cache.set_at(format!("k{}", i), "v".into(), start);
        }
        assert_eq!(cache.len(), 5000);
        assert!(cache.get_at("k0", start).is_some());
        assert_eq!(cache.get_at("k1", start + Duration::from_millis(200)), None);
    }
}
