//! Prometheus-backed [`MetricsSink`].
//!
//! Collectors are created on first use and registered into the sink's
//! registry (the process-wide `ledger_telemetry::REGISTRY` by default).

use parking_lot::Mutex;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, Registry};
use std::collections::HashMap;

use crate::application::{DURATION_SECONDS, ERRORS_TOTAL, REQUESTS_TOTAL};
use crate::domain::QueryLabels;
use crate::ports::MetricsSink;

/// Histogram label names, in value order.
pub const DURATION_LABELS: [&str; 3] = ["channel", "chaincode", "function"];

fn help_text(name: &str) -> &str {
    match name {
        REQUESTS_TOTAL => "Total ledger query facade calls",
        ERRORS_TOTAL => "Total failed ledger query facade calls",
        DURATION_SECONDS => "Time spent in ledger query facade calls",
        other => other,
    }
}

/// Metrics sink writing Prometheus counters and histograms.
pub struct PrometheusMetricsSink {
    registry: Registry,
    counters: Mutex<HashMap<String, IntCounter>>,
    histograms: Mutex<HashMap<String, HistogramVec>>,
}

impl PrometheusMetricsSink {
    /// Sink registering into the global registry.
    pub fn new() -> Self {
        Self::with_registry(ledger_telemetry::REGISTRY.clone())
    }

    /// Sink registering into `registry`.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            counters: Mutex::new(HashMap::new()),
            histograms: Mutex::new(HashMap::new()),
        }
    }

    /// Registry the collectors live in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn counter(&self, name: &str) -> Option<IntCounter> {
        let mut counters = self.counters.lock();
        if let Some(counter) = counters.get(name) {
            return Some(counter.clone());
        }

        let counter = IntCounter::new(name, help_text(name))
            .and_then(|c| self.registry.register(Box::new(c.clone())).map(|_| c));
        match counter {
            Ok(counter) => {
                counters.insert(name.to_string(), counter.clone());
                Some(counter)
            }
            Err(e) => {
                tracing::warn!(metric = name, "Failed to register counter: {}", e);
                None
            }
        }
    }

    fn histogram(&self, name: &str) -> Option<HistogramVec> {
        let mut histograms = self.histograms.lock();
        if let Some(histogram) = histograms.get(name) {
            return Some(histogram.clone());
        }

        let opts =
            HistogramOpts::new(name, help_text(name)).buckets(ledger_telemetry::duration_buckets());
        let histogram = HistogramVec::new(opts, &DURATION_LABELS)
            .and_then(|h| self.registry.register(Box::new(h.clone())).map(|_| h));
        match histogram {
            Ok(histogram) => {
                histograms.insert(name.to_string(), histogram.clone());
                Some(histogram)
            }
            Err(e) => {
                tracing::warn!(metric = name, "Failed to register histogram: {}", e);
                None
            }
        }
    }
}

impl Default for PrometheusMetricsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn increment(&self, name: &str) {
        if let Some(counter) = self.counter(name) {
            counter.inc();
        }
    }

    fn observe(&self, name: &str, labels: &QueryLabels, seconds: f64) {
        if let Some(histogram) = self.histogram(name) {
            histogram
                .with_label_values(&[
                    labels.channel.as_deref().unwrap_or(""),
                    labels.chaincode.as_deref().unwrap_or(""),
                    &labels.function,
                ])
                .observe(seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChaincodeQuery;

    #[test]
    fn test_counters_registered_once() {
        let sink = PrometheusMetricsSink::with_registry(Registry::new());
        sink.increment(REQUESTS_TOTAL);
        sink.increment(REQUESTS_TOTAL);
        sink.increment(ERRORS_TOTAL);

        let text = ledger_telemetry::encode_registry(sink.registry()).unwrap();
        assert!(text.contains("ledger_query_requests_total 2"));
        assert!(text.contains("ledger_query_errors_total 1"));
    }

    #[test]
    fn test_histogram_labels() {
        let sink = PrometheusMetricsSink::with_registry(Registry::new());
        let query = ChaincodeQuery::new("mychannel", "mycc", "query", vec![]);
        sink.observe(DURATION_SECONDS, &QueryLabels::chaincode(&query), 0.02);
        sink.observe(
            DURATION_SECONDS,
            &QueryLabels::operation(None, "get_channels"),
            0.01,
        );

        let text = ledger_telemetry::encode_registry(sink.registry()).unwrap();
        let counts: Vec<&str> = text
            .lines()
            .filter(|l| l.starts_with("ledger_query_duration_seconds_count"))
            .collect();
        assert_eq!(counts.len(), 2);
        assert!(counts
            .iter()
            .any(|l| l.contains(r#"chaincode="mycc""#) && l.contains(r#"function="query""#)));
        assert!(counts
            .iter()
            .any(|l| l.contains(r#"channel="""#) && l.contains(r#"function="get_channels""#)));
    }

    #[test]
    fn test_invalid_metric_name_is_skipped() {
        let sink = PrometheusMetricsSink::with_registry(Registry::new());
        sink.increment("not a valid name");
        assert!(sink.registry().gather().is_empty());
    }
}
