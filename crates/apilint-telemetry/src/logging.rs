//! Subscriber setup and the structured events apilint emits.
//!
//! Every event carries an `event` field naming it, so log pipelines can
//! filter on `event="validation_failed"` without parsing messages.

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::{LogFormat, TelemetryConfig, TelemetryError};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(level_filter(&config.log_level)))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// `RUST_LOG` when it is set and parses, else the configured directive.
fn level_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Values of the `event` field.
pub mod events {
    /// `serve` resolved its configuration (fields: service, version, listen, timeouts).
    pub const STARTUP: &str = "startup";

    /// The listener is bound (fields: addr, allowed_origins).
    pub const LISTENING: &str = "listening";

    /// Graceful shutdown finished.
    pub const SHUTDOWN: &str = "shutdown";

    /// A request produced a problem list (fields: problems, duration_ms).
    pub const VALIDATION_COMPLETED: &str = "validation_completed";

    /// A request ended with an error envelope (fields: code, error, duration_ms).
    pub const VALIDATION_FAILED: &str = "validation_failed";

    /// Ruleset text came back from HTTP or the cache (fields: url, bytes, cached, content_type).
    pub const RULESET_FETCHED: &str = "ruleset_fetched";
}

#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::STARTUP, $($field)*)
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::LISTENING, $($field)*)
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::SHUTDOWN, $($field)*)
    };
}

#[macro_export]
macro_rules! log_validation_completed {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::VALIDATION_COMPLETED, $($field)*)
    };
}

#[macro_export]
macro_rules! log_validation_failed {
    ($($field:tt)*) => {
        tracing::warn!(event = $crate::logging::events::VALIDATION_FAILED, $($field)*)
    };
}

/// Logged at `debug`.
#[macro_export]
macro_rules! log_ruleset_fetched {
    ($($field:tt)*) => {
        tracing::debug!(event = $crate::logging::events::RULESET_FETCHED, $($field)*)
    };
}
