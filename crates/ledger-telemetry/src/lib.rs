//! # Ledger Telemetry
//!
//! Logging and metrics plumbing shared by the ledger query crates.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with an env filter and a
//!   pretty or JSON formatting layer
//! - **Metrics**: a process-wide Prometheus [`Registry`](prometheus::Registry)
//!   plus text encoding for scrape endpoints
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledger_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(&config).expect("telemetry init");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LQ_SERVICE_NAME` | `ledger-query` | Service name attached to logs |
//! | `LQ_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `LQ_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `LQ_JSON_LOGS` | `false` | Emit JSON formatted logs |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, LoggingGuard};
pub use metrics::{duration_buckets, encode_metrics, encode_registry, REGISTRY};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be created, registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging for the process.
///
/// Metrics need no global initialization: collectors register themselves
/// into [`REGISTRY`] when the sink that owns them is built.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let logging = init_logging(config)?;
    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );
    Ok(TelemetryGuard { _logging: logging })
}

/// Guard that keeps telemetry active for the lifetime of the application.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
