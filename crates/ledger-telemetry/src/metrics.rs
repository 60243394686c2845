//! Prometheus registry and helpers.
//!
//! Metric names follow the convention `ledger_query_<metric>_<unit>`.
//! Collectors are created by their owners (see the query crate's metrics
//! adapter) and registered into [`REGISTRY`] or a caller-provided registry.

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Encoder, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();
}

/// Histogram buckets for network round-trips: 1ms doubling up to ~16s.
pub fn duration_buckets() -> Vec<f64> {
    exponential_buckets(0.001, 2.0, 15).unwrap_or_else(|_| prometheus::DEFAULT_BUCKETS.to_vec())
}

/// Encode all metrics in the global registry as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    encode_registry(&REGISTRY)
}

/// Encode all metrics of `registry` as Prometheus text format.
pub fn encode_registry(registry: &Registry) -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
