//! Group Metrics Exporter
//!
//! Renders every registered group's counters as Prometheus gauges labelled
//! by group name:
//!
//! ```text
//! peercache_group_gets{group="scores"} 12
//! peercache_group_cache_hits{group="scores"} 9
//! ```

use prometheus::{Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::cache::{CacheStats, GroupRegistry, GroupStatsSnapshot};
use crate::error::{Error, Result};

const GAUGES: &[(&str, &str)] = &[
    ("gets", "Get requests, including from peers"),
    ("cache_hits", "Requests served from the main cache"),
    ("peer_loads", "Values fetched from a remote peer"),
    ("peer_errors", "Failed remote peer fetches"),
    ("loads", "Misses entering the coalescer"),
    ("loads_deduped", "Loads run after coalescing"),
    ("local_loads", "Successful origin loads"),
    ("local_load_errs", "Failed origin loads"),
    ("cache_bytes", "Bytes held in the main cache"),
    ("cache_items", "Entries held in the main cache"),
    ("cache_evictions", "Entries evicted from the main cache"),
];

fn gauge_value(name: &str, stats: &GroupStatsSnapshot, cache: &CacheStats) -> u64 {
    match name {
        "gets" => stats.gets,
        "cache_hits" => stats.cache_hits,
        "peer_loads" => stats.peer_loads,
        "peer_errors" => stats.peer_errors,
        "loads" => stats.loads,
        "loads_deduped" => stats.loads_deduped,
        "local_loads" => stats.local_loads,
        "local_load_errs" => stats.local_load_errs,
        "cache_bytes" => cache.bytes,
        "cache_items" => cache.items,
        "cache_evictions" => cache.evictions,
        _ => 0,
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("metrics: {}", e))
}

/// Private Prometheus registry holding one gauge vector per counter
pub struct GroupMetrics {
    registry: Registry,
    gauges: Vec<(&'static str, IntGaugeVec)>,
}

impl GroupMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let mut gauges = Vec::with_capacity(GAUGES.len());

        for &(name, help) in GAUGES {
            let opts = Opts::new(format!("peercache_group_{}", name), help);
            let vec = IntGaugeVec::new(opts, &["group"]).map_err(metrics_error)?;
            registry
                .register(Box::new(vec.clone()))
                .map_err(metrics_error)?;
            gauges.push((name, vec));
        }

        Ok(Self { registry, gauges })
    }

    /// Refresh every gauge from the current state of `groups`
    pub fn update(&self, groups: &GroupRegistry) {
        for group in groups.groups() {
            let stats = group.stats();
            let cache = group.cache_stats();
            for (name, vec) in &self.gauges {
                let value = i64::try_from(gauge_value(name, &stats, &cache)).unwrap_or(i64::MAX);
                vec.with_label_values(&[group.name()]).set(value);
            }
        }
    }

    /// Prometheus text format of the last update
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| Error::Internal(format!("metrics: {}", e)))
    }

    /// Content type for `render` output
    pub fn format_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

/// One-shot rendering of `groups` as Prometheus text
pub fn encode(groups: &GroupRegistry) -> Result<String> {
    let metrics = GroupMetrics::new()?;
    metrics.update(groups);
    metrics.render()
}
