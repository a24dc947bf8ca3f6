//! Remote ruleset fetching.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode, Url};

use crate::error::FetchError;

/// Body and media type of a fetched ruleset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedRuleset {
    pub body: String,
    pub content_type: Option<String>,
}

/// Capability to fetch ruleset text over HTTP(S).
///
/// Injected into the resolver and loader so callers can substitute a
/// recording or failing implementation.
#[async_trait]
pub trait RulesetFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedRuleset, FetchError>;
}

/// HTTP fetcher configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Total request timeout.
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 8,
        }
    }
}

impl FetchConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`RulesetFetcher`] backed by a pooled `reqwest` client.
///
/// Issues a single GET per call; there are no retries.
#[derive(Debug, Clone)]
pub struct HttpRulesetFetcher {
    client: Client,
}

impl HttpRulesetFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(concat!("apilint/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RulesetFetcher for HttpRulesetFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedRuleset, FetchError> {
        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(transport)?;

        tracing::debug!(url = %url, bytes = body.len(), "ruleset response received");
        Ok(FetchedRuleset { body, content_type })
    }
}
