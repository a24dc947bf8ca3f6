//! Observability for the apilint validation service.
//!
//! This crate provides:
//! - Structured JSON (or pretty) logging with standard event names
//! - A Prometheus metrics registry and text exposition
//!
//! # Usage
//!
//! ```ignore
//! use apilint_telemetry::{LogFormat, Telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::new("debug", LogFormat::Pretty);
//! let telemetry = Telemetry::init(config)?;
//! let metrics = telemetry.metrics_clone();
//! ```

pub mod config;
pub mod logging;
pub mod metrics;
pub mod prometheus;

pub use config::{LogFormat, TelemetryConfig, SERVICE_NAME};
pub use logging::events;
pub use metrics::MetricsRegistry;
pub use prometheus::PROMETHEUS_CONTENT_TYPE;

use std::sync::Arc;
use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Main telemetry handle, owning the metrics registry.
pub struct Telemetry {
    metrics: Arc<MetricsRegistry>,
}

impl Telemetry {
    /// Initialize logging and create the metrics registry.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        logging::init_logging(&config)?;
        Ok(Self::init_without_logging())
    }

    /// Create the metrics registry without installing a subscriber.
    ///
    /// Use this when logging is already initialized (e.g., in tests).
    pub fn init_without_logging() -> Self {
        Self {
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Get a cloned Arc reference to the metrics registry.
    pub fn metrics_clone(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Render metrics in Prometheus text format.
    pub fn render_prometheus(&self) -> String {
        prometheus::render_metrics(&self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert_eq!(
            TelemetryConfig::default(),
            TelemetryConfig::new("info", LogFormat::Json)
        );
    }

    #[test]
    fn test_telemetry_init_without_logging() {
        let telemetry = Telemetry::init_without_logging();
        telemetry.metrics().record_validation("ok", 0.01);
        assert!(telemetry
            .render_prometheus()
            .contains("apilint_validations_total"));
    }
}
