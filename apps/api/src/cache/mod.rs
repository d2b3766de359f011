//! Bounded, thread-safe key/value store with FIFO eviction.
//!
//! One instance exists per cache purpose (generated drawings, parse results,
//! packaged archives). Each store sits behind its own coarse `Mutex`; eviction
//! follows insertion order only, reads never refresh an entry.

pub mod keys;

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

pub use keys::{batch_key, cache_key, content_hash};

#[derive(Debug)]
pub struct CacheStore<V> {
    name: String,
    max_entries: usize,
    inner: Mutex<CacheInner<V>>,
}

#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, V>,
    /// Keys in insertion order. Overwriting a key keeps its original slot.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub max_entries: usize,
    /// Percentage, 0.0 – 100.0.
    pub hit_rate: f64,
}

impl<V: Clone> CacheStore<V> {
    /// `max_entries` is clamped to at least 1 so the key being inserted is never
    /// the one evicted.
    pub fn new(name: impl Into<String>, max_entries: usize) -> Self {
        Self {
            name: name.into(),
            max_entries: max_entries.max(1),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.lock();
        match inner.entries.get(key).cloned() {
            Some(value) => {
                inner.hits += 1;
                debug!("[{}] Cache hit: {key}", self.name);
                Some(value)
            }
            None => {
                inner.misses += 1;
                debug!("[{}] Cache miss: {key}", self.name);
                None
            }
        }
    }

    /// Inserts or overwrites, then evicts the oldest entries while over capacity.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut inner = self.lock();

        if inner.entries.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
        }

        while inner.entries.len() > self.max_entries {
            let Some(evicted) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&evicted);
            debug!("[{}] Cache eviction: {evicted}", self.name);
        }
    }

    /// Drops every entry. Hit/miss counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        info!("[{}] Cache cleared", self.name);
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total > 0 {
            inner.hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        CacheStats {
            name: self.name.clone(),
            hits: inner.hits,
            misses: inner.misses,
            size: inner.entries.len(),
            max_entries: self.max_entries,
            hit_rate,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        // Every mutation completes before the guard drops, so a poisoned lock
        // still guards consistent state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_get_set_round_trip() {
        let cache = CacheStore::new("test", 10);
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn test_fifo_evicts_exactly_the_first_inserted() {
        let cache = CacheStore::new("fifo", 3);
        for (i, key) in ["k1", "k2", "k3", "k4"].iter().enumerate() {
            cache.set(*key, i);
        }
        assert_eq!(cache.stats().size, 3);
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert!(cache.get("k4").is_some());
    }

    #[test]
    fn test_eviction_ignores_access_recency() {
        let cache = CacheStore::new("fifo", 2);
        cache.set("old", 1);
        cache.set("new", 2);
        // Reading "old" does not protect it.
        assert_eq!(cache.get("old"), Some(1));
        cache.set("newest", 3);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }

    #[test]
    fn test_overwrite_keeps_insertion_slot() {
        let cache = CacheStore::new("fifo", 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        assert_eq!(cache.stats().size, 2);
        cache.set("c", 3);
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn test_zero_capacity_keeps_the_new_key() {
        let cache = CacheStore::new("tiny", 0);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get("b"), Some(2));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = CacheStore::new("stats", 5);
        cache.set("a", "x");
        cache.get("a");
        cache.get("a");
        cache.get("missing");
        let stats = cache.stats();
        assert_eq!(stats.name, "stats");
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = CacheStore::new("clear", 5);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.clear();
        assert_eq!(cache.stats().size, 0);
        cache.set("c", 3);
        cache.set("d", 4);
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn test_concurrent_writers_never_exceed_capacity() {
        let cache = Arc::new(CacheStore::new("concurrent", 16));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        cache.set(format!("{t}-{i}"), i);
                        cache.get(&format!("{t}-{}", i / 2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.stats().size, 16);
        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 8 * 200);
    }
}
