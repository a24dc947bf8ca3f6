//! Validation pipeline: resolve ruleset, load, lint, map.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;

use apilint_ruleset::{
    FetchConfig, FetchError, FetchedRuleset, HttpRulesetFetcher, RulesetCache, RulesetError,
    RulesetFetcher, RulesetLoader, RulesetResolver, Url,
};
use apilint_telemetry::{log_validation_completed, log_validation_failed, MetricsRegistry};

use crate::error::ErrorCode;
use crate::problem::{ProblemSeverity, ValidationProblem};

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Timeout of each remote ruleset fetch.
    pub fetch_timeout: Duration,
    /// Bound on the whole pipeline.
    pub timeout: Duration,
    /// Lifetime of cached remote rulesets; `None` disables the cache.
    pub cache_ttl: Option<Duration>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            cache_ttl: None,
        }
    }
}

/// Pipeline failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Ruleset(#[from] RulesetError),

    #[error("validation did not complete within {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("validation task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ValidationError {
    /// Error code reported to clients.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Ruleset(RulesetError::NotFound { .. }) => ErrorCode::RulesetNotFound,
            Self::Ruleset(e) if e.is_invalid_ruleset() => ErrorCode::InvalidRuleset,
            Self::Ruleset(_) => ErrorCode::SpectralError,
            Self::Timeout(_) | Self::Worker(_) => ErrorCode::ServerError,
        }
    }
}

/// Runs validations. Cheap to clone; clones share the HTTP client, cache and
/// metrics.
#[derive(Clone)]
pub struct ValidationService {
    loader: RulesetLoader,
    metrics: Arc<MetricsRegistry>,
    timeout: Duration,
}

impl ValidationService {
    /// Build a service fetching remote rulesets over HTTP.
    pub fn new(config: &ValidationConfig, metrics: Arc<MetricsRegistry>) -> Result<Self, FetchError> {
        let fetcher =
            HttpRulesetFetcher::new(FetchConfig::default().with_timeout(config.fetch_timeout))?;
        Ok(Self::with_fetcher(Arc::new(fetcher), config, metrics))
    }

    /// Build a service around a custom fetcher.
    pub fn with_fetcher(
        fetcher: Arc<dyn RulesetFetcher>,
        config: &ValidationConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let fetcher = Arc::new(MeteredFetcher {
            inner: fetcher,
            metrics: Arc::clone(&metrics),
        });
        let resolver =
            RulesetResolver::new(fetcher).with_cache(config.cache_ttl.map(RulesetCache::new));
        Self {
            loader: RulesetLoader::new(resolver),
            metrics,
            timeout: config.timeout,
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Validate `document` against the ruleset designated by `ruleset`.
    ///
    /// Dropping the returned future cancels any in-flight fetch.
    pub async fn validate(
        &self,
        document: String,
        ruleset: &str,
    ) -> Result<Vec<ValidationProblem>, ValidationError> {
        let _in_flight = InFlight::start(&self.metrics);
        let start = Instant::now();

        let result = match tokio::time::timeout(self.timeout, self.run(document, ruleset)).await {
            Ok(result) => result,
            Err(_) => Err(ValidationError::Timeout(self.timeout)),
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(problems) => {
                self.metrics.record_validation("ok", elapsed.as_secs_f64());
                self.record_problems(problems);
                log_validation_completed!(
                    problems = problems.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "validation completed"
                );
            }
            Err(e) => {
                let code = e.code();
                self.metrics
                    .record_validation(code.as_str(), elapsed.as_secs_f64());
                log_validation_failed!(
                    code = code.as_str(),
                    error = %e,
                    duration_ms = elapsed.as_millis() as u64,
                    "validation failed"
                );
            }
        }
        result
    }

    async fn run(
        &self,
        document: String,
        ruleset: &str,
    ) -> Result<Vec<ValidationProblem>, ValidationError> {
        let bundle = self.loader.load_bundle(ruleset).await?;
        let problems = tokio::task::spawn_blocking(move || {
            let ruleset = bundle.compile().map_err(RulesetError::from)?;
            Ok::<_, RulesetError>(
                apilint_engine::lint(&ruleset, &document)
                    .iter()
                    .map(ValidationProblem::from)
                    .collect::<Vec<_>>(),
            )
        })
        .await??;
        Ok(problems)
    }

    fn record_problems(&self, problems: &[ValidationProblem]) {
        for severity in [
            ProblemSeverity::High,
            ProblemSeverity::Medium,
            ProblemSeverity::Low,
            ProblemSeverity::Ignore,
        ] {
            let count = problems.iter().filter(|p| p.severity == severity).count();
            if count > 0 {
                self.metrics.record_problems(severity.as_str(), count as u64);
            }
        }
    }
}

/// Keeps the in-flight gauge accurate even when the validation future is
/// dropped mid-way.
struct InFlight<'a>(&'a MetricsRegistry);

impl<'a> InFlight<'a> {
    fn start(metrics: &'a MetricsRegistry) -> Self {
        metrics.validation_started();
        Self(metrics)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.validation_finished();
    }
}

/// Records fetch outcomes and latency.
struct MeteredFetcher {
    inner: Arc<dyn RulesetFetcher>,
    metrics: Arc<MetricsRegistry>,
}

#[async_trait]
impl RulesetFetcher for MeteredFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedRuleset, FetchError> {
        let start = Instant::now();
        let result = self.inner.fetch(url).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(FetchError::NotFound { .. }) => "not_found",
            Err(_) => "error",
        };
        self.metrics
            .record_ruleset_fetch(outcome, start.elapsed().as_secs_f64());
        result
    }
}
