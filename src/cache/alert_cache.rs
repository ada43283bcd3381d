use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Alert;

/// Thread-safe bounded LRU cache for normalized alerts.
///
/// The cache is the source of truth for the store: index entries that no
/// longer resolve here must be treated as absent. Counters live under the
/// same lock as the entries so `clear` empties and resets atomically.
#[derive(Debug)]
pub struct AlertCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

#[derive(Debug)]
struct CacheInner {
    entries: LruCache<String, Alert>,
    hits: u64,
    misses: u64,
    evictions: u64,
    overwrites: u64,
}

impl CacheInner {
    fn reset_stats(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
        self.overwrites = 0;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub overwrites: u64,
}

impl CacheStats {
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl AlertCache {
    pub fn new(capacity: usize) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidArgument,
                "cache capacity must be greater than zero".to_string(),
            )
        })?;

        Ok(AlertCache {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(cap),
                hits: 0,
                misses: 0,
                evictions: 0,
                overwrites: 0,
            }),
            capacity,
        })
    }

    /// Insert or replace an entry, evicting the least-recently-used one
    /// when the cache is full. Both paths leave the key most-recently-used.
    pub fn put(&self, key: String, value: Alert) {
        let mut inner = self.inner.lock();
        if let Some((displaced, _)) = inner.entries.push(key.clone(), value) {
            if displaced == key {
                inner.overwrites += 1;
            } else {
                inner.evictions += 1;
            }
        }
    }

    /// Look up an entry and mark it most-recently-used.
    pub fn get(&self, key: &str) -> Option<Alert> {
        let mut inner = self.inner.lock();
        if let Some(alert) = inner.entries.get(key) {
            let alert = alert.clone();
            inner.hits += 1;
            Some(alert)
        } else {
            inner.misses += 1;
            None
        }
    }

    /// Remove an entry if present. No recency or hit/miss side effects.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.pop(key).is_some()
    }

    /// Presence check without touching recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().entries.contains(key)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.reset_stats();
        info!(removed, "alert cache cleared");
    }

    pub fn size(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys ordered most-recently-used first.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        inner.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            size: inner.entries.len(),
            capacity: self.capacity,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            overwrites: inner.overwrites,
        }
    }

    pub fn reset_stats(&self) {
        self.inner.lock().reset_stats();
    }
}
