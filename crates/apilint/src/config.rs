//! Server configuration.

use std::net::SocketAddr;

use crate::pipeline::ValidationConfig;

/// Default request body limit (10 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Settings of the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Exact origins allowed by CORS; empty allows none.
    pub allowed_origins: Vec<String>,
    pub max_body_size: usize,
    pub validation: ValidationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            allowed_origins: Vec::new(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            validation: ValidationConfig::default(),
        }
    }
}

/// Split a comma-separated origin list. `fallback` is used when `primary` is
/// unset or blank.
pub fn parse_origins(primary: Option<&str>, fallback: Option<&str>) -> Vec<String> {
    let raw = primary
        .filter(|s| !s.trim().is_empty())
        .or(fallback)
        .unwrap_or_default();
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
