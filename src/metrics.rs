//! Prometheus metrics for stat catalog cycles

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, CounterVec, Encoder, Gauge, TextEncoder,
};

lazy_static! {
    /// Catalog cycles by operation and outcome
    pub static ref CYCLES_TOTAL: CounterVec = register_counter_vec!(
        "kuba_stats_cycles_total",
        "Total catalog cycles by operation and outcome",
        &["operation", "outcome"]
    ).unwrap();

    /// Catalog entries touched by kind (updated, created, seeded)
    pub static ref ENTRIES_TOTAL: CounterVec = register_counter_vec!(
        "kuba_stats_entries_total",
        "Catalog entries touched by kind",
        &["kind"]
    ).unwrap();

    /// Persist attempts by status
    pub static ref PERSISTS_TOTAL: CounterVec = register_counter_vec!(
        "kuba_stats_persists_total",
        "Catalog persist attempts by status",
        &["status"]
    ).unwrap();

    /// Failed merges by aggregator type
    pub static ref MERGE_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "kuba_stats_merge_failures_total",
        "Failed merges by aggregator type",
        &["aggregator"]
    ).unwrap();

    /// Number of entries in the catalog after the last cycle
    pub static ref CATALOG_ENTRIES: Gauge = register_gauge!(
        "kuba_stats_catalog_entries",
        "Number of catalog entries after the last cycle"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder.encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer)
        .map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record the end of a catalog cycle
#[inline]
pub fn record_cycle(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    CYCLES_TOTAL.with_label_values(&[operation, outcome]).inc();
}

/// Record catalog entries touched in a cycle
#[inline]
pub fn record_entries(kind: &str, count: usize) {
    if count > 0 {
        ENTRIES_TOTAL.with_label_values(&[kind]).inc_by(count as f64);
    }
}

/// Record a persist attempt
#[inline]
pub fn record_persist(success: bool) {
    let status = if success { "success" } else { "error" };
    PERSISTS_TOTAL.with_label_values(&[status]).inc();
}

/// Record a failed merge
#[inline]
pub fn record_merge_failure(aggregator: &str) {
    MERGE_FAILURES_TOTAL.with_label_values(&[aggregator]).inc();
}

/// Update catalog size
#[inline]
pub fn update_catalog_entries(count: usize) {
    CATALOG_ENTRIES.set(count as f64);
}
