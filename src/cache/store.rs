//! Main Cache - the lock-guarded Eviction Store owned by a group
//!
//! Every access, including reads that promote recency, goes through one
//! `parking_lot::Mutex`. The lock is never held across an `.await`.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::byteview::ByteView;
use super::lru::LruCache;
use super::stats::CacheStats;

/// Byte-budgeted store of `ByteView`s shared by concurrent `get` calls
pub struct MainCache {
    /// The LRU itself
    lru: Mutex<LruCache<ByteView>>,
    /// Lookups
    gets: AtomicU64,
    /// Lookups that found an entry
    hits: AtomicU64,
}

impl MainCache {
    /// Create a main cache with the given byte budget (0 = unbounded)
    pub fn new(cache_bytes: u64) -> Self {
        Self {
            lru: Mutex::new(LruCache::new(cache_bytes)),
            gets: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// Look up `key`, promoting it on a hit
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        let value = self.lru.lock().get(key).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Insert or replace `key`, evicting as needed
    pub fn add(&self, key: &str, value: ByteView) {
        self.lru.lock().add(key, value);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lru.lock().len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.lru.lock().is_empty()
    }

    /// Bytes currently held (keys + values)
    pub fn bytes(&self) -> u64 {
        self.lru.lock().bytes()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let lru = self.lru.lock();
        CacheStats {
            bytes: lru.bytes(),
            items: lru.len() as u64,
            gets: self.gets.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            evictions: lru.evictions(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
