//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implementations of outbound port traits.

mod prometheus_metrics;

pub use prometheus_metrics::{PrometheusMetricsSink, DURATION_LABELS};
