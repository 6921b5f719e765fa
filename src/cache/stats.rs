//! Group Statistics
//!
//! Counters for monitoring how a group serves its traffic.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-group counters
#[derive(Debug, Default)]
pub struct GroupStats {
    /// Any `get` request, including from peers
    gets: AtomicU64,
    /// Served from the main cache
    cache_hits: AtomicU64,
    /// Served by a remote peer
    peer_loads: AtomicU64,
    /// Peer fetches that failed and fell back to the origin
    peer_errors: AtomicU64,
    /// Misses that entered the coalescer
    loads: AtomicU64,
    /// Computations actually run (after coalescing)
    loads_deduped: AtomicU64,
    /// Origin callback successes
    local_loads: AtomicU64,
    /// Origin callback failures
    local_load_errs: AtomicU64,
}

impl GroupStats {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_load(&self) {
        self.peer_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_error(&self) {
        self.peer_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_deduped(&self) {
        self.loads_deduped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load(&self) {
        self.local_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_load_err(&self) {
        self.local_load_errs.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> GroupStatsSnapshot {
        GroupStatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            loads_deduped: self.loads_deduped.load(Ordering::Relaxed),
            local_loads: self.local_loads.load(Ordering::Relaxed),
            local_load_errs: self.local_load_errs.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of group counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupStatsSnapshot {
    pub gets: u64,
    pub cache_hits: u64,
    pub peer_loads: u64,
    pub peer_errors: u64,
    pub loads: u64,
    pub loads_deduped: u64,
    pub local_loads: u64,
    pub local_load_errs: u64,
}

/// Main cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Bytes held (keys + values)
    pub bytes: u64,
    /// Entries held
    pub items: u64,
    /// Lookups
    pub gets: u64,
    /// Lookups that hit
    pub hits: u64,
    /// Entries evicted
    pub evictions: u64,
}

impl CacheStats {
    /// Hit ratio (0.0 - 1.0)
    pub fn hit_ratio(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.hits as f64 / self.gets as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_creation() {
        let stats = GroupStats::new();
        assert_eq!(stats.snapshot(), GroupStatsSnapshot::default());
    }

    #[test]
    fn test_counters() {
        let stats = GroupStats::new();
        stats.record_get();
        stats.record_get();
        stats.record_cache_hit();
        stats.record_load();
        stats.record_load_deduped();
        stats.record_peer_error();
        stats.record_local_load();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.gets, 2);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.loads, 1);
        assert_eq!(snapshot.loads_deduped, 1);
        assert_eq!(snapshot.peer_errors, 1);
        assert_eq!(snapshot.local_loads, 1);
        assert_eq!(snapshot.peer_loads, 0);
        assert_eq!(snapshot.local_load_errs, 0);
    }

    #[test]
    fn test_hit_ratio_empty() {
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_value(GroupStatsSnapshot {
            gets: 3,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json["gets"], 3);
    }
}
