//! Logging settings shared by `apilint serve` and `apilint lint`.

use std::fmt;
use std::str::FromStr;

/// Name reported in the startup event.
pub const SERVICE_NAME: &str = "apilint";

/// How log events are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line, fields flattened into the event.
    #[default]
    Json,
    /// Multi-line output with source locations, for local runs.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("pretty") {
            Ok(Self::Pretty)
        } else {
            Err(format!("unknown log format '{}' (json or pretty)", s))
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

/// `LOG_LEVEL` and `LOG_FORMAT` as resolved by the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive, e.g. `info` or `apilint_ruleset=debug`.
    /// Ignored when `RUST_LOG` is set.
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("info", LogFormat::default())
    }
}

impl TelemetryConfig {
    pub fn new(log_level: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            log_level: log_level.into(),
            log_format,
        }
    }
}
