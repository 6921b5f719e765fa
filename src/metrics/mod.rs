//! Metrics module
//!
//! Prometheus text exposition of per-group cache statistics.

mod exporter;

pub use exporter::{encode, GroupMetrics};
