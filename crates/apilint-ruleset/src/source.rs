//! Ruleset reference resolution.
//!
//! A reference is either an absolute `http`/`https` URL, which is fetched, or
//! literal ruleset content, which is used as is. Anything that is not such a
//! URL (inline JSON or YAML, `file://`, `ftp://`, relative paths) is literal
//! and never triggers a network call.

use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;

use apilint_telemetry::log_ruleset_fetched;

use crate::cache::RulesetCache;
use crate::error::{FetchError, RulesetError};
use crate::fetch::{FetchedRuleset, RulesetFetcher};

/// Outcome of resolving a ruleset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesetSource {
    /// The reference was not a remote URL.
    Literal(String),
    /// Fetched content classified as JSON.
    Json { url: Url, text: String },
    /// Fetched content classified as YAML.
    Yaml { url: Url, text: String },
}

impl RulesetSource {
    /// Classify fetched content, by `Content-Type` first and by sniffing second.
    pub fn classify(url: Url, fetched: FetchedRuleset) -> Self {
        let FetchedRuleset { body, content_type } = fetched;
        let media_type = content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });

        let is_json = match media_type.as_deref() {
            Some(mt) if mt.ends_with("json") => true,
            Some(mt) if mt.contains("yaml") || mt.ends_with("yml") => false,
            _ => looks_like_json(&body),
        };

        if is_json {
            Self::Json { url, text: body }
        } else {
            Self::Yaml { url, text: body }
        }
    }

    /// URL the content was fetched from, if any.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Literal(_) => None,
            Self::Json { url, .. } | Self::Yaml { url, .. } => Some(url),
        }
    }

    /// Raw text as received.
    pub fn text(&self) -> &str {
        match self {
            Self::Literal(text) | Self::Json { text, .. } | Self::Yaml { text, .. } => text,
        }
    }

    /// Text handed to the loader. YAML is re-serialised as JSON; YAML that
    /// does not parse passes through unchanged.
    pub fn to_json_text(&self) -> String {
        match self {
            Self::Literal(text) | Self::Json { text, .. } => text.clone(),
            Self::Yaml { url, text } => match yaml_to_json(text) {
                Ok(json) => json,
                Err(error) => {
                    tracing::debug!(url = %url, error = %error, "ruleset is not valid YAML, passing through");
                    text.clone()
                }
            },
        }
    }
}

fn looks_like_json(body: &str) -> bool {
    let trimmed = body.trim_start();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<Value>(trimmed).is_ok()
}

fn yaml_to_json(text: &str) -> Result<String, String> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    serde_json::to_string(&value).map_err(|e| e.to_string())
}

/// Parse `reference` as an absolute `http`/`https` URL.
pub fn remote_url(reference: &str) -> Option<Url> {
    let url = Url::parse(reference.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Resolves ruleset references, fetching remote ones.
#[derive(Clone)]
pub struct RulesetResolver {
    fetcher: Arc<dyn RulesetFetcher>,
    cache: Option<RulesetCache>,
}

impl RulesetResolver {
    pub fn new(fetcher: Arc<dyn RulesetFetcher>) -> Self {
        Self {
            fetcher,
            cache: None,
        }
    }

    /// Enable (or disable with `None`) caching of fetched rulesets.
    pub fn with_cache(mut self, cache: Option<RulesetCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> Option<&RulesetCache> {
        self.cache.as_ref()
    }

    /// Resolve a reference into ruleset content.
    ///
    /// A 404 becomes [`RulesetError::NotFound`] naming `reference` as the
    /// caller wrote it; other fetch failures become [`RulesetError::Fetch`].
    pub async fn resolve(&self, reference: &str) -> Result<RulesetSource, RulesetError> {
        let Some(url) = remote_url(reference) else {
            return Ok(RulesetSource::Literal(reference.to_string()));
        };
        match self.fetch(&url).await {
            Ok(source) => Ok(source),
            Err(FetchError::NotFound { .. }) => Err(RulesetError::NotFound {
                url: reference.to_string(),
            }),
            Err(other) => Err(RulesetError::Fetch(other)),
        }
    }

    /// Fetch and classify a remote ruleset, going through the cache.
    pub async fn fetch(&self, url: &Url) -> Result<RulesetSource, FetchError> {
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(url.as_str())) {
            log_ruleset_fetched!(url = %url, bytes = cached.body.len(), cached = true, "ruleset served from cache");
            return Ok(RulesetSource::classify(url.clone(), cached));
        }

        let fetched = self.fetcher.fetch(url).await?;
        log_ruleset_fetched!(
            url = %url,
            bytes = fetched.body.len(),
            content_type = fetched.content_type.as_deref().unwrap_or(""),
            cached = false,
            "ruleset fetched"
        );

        if let Some(cache) = &self.cache {
            cache.insert(url.as_str(), fetched.clone());
        }
        Ok(RulesetSource::classify(url.clone(), fetched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticFetcher;
    use std::time::Duration;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn fetched(body: &str, content_type: Option<&str>) -> FetchedRuleset {
        FetchedRuleset {
            body: body.to_string(),
            content_type: content_type.map(str::to_string),
        }
    }

    #[test]
    fn remote_url_detection() {
        assert!(remote_url("https://example.com/ruleset.yaml").is_some());
        assert!(remote_url("  http://localhost:8080/r.json ").is_some());
        assert!(remote_url("ftp://example.com/ruleset.yaml").is_none());
        assert!(remote_url("file:///etc/ruleset.yaml").is_none());
        assert!(remote_url(r#"{"rules":{}}"#).is_none());
        assert!(remote_url("rules:\n  a: true\n").is_none());
        assert!(remote_url("./ruleset.yaml").is_none());
    }

    #[test]
    fn classify_by_content_type_first() {
        let u = url("https://example.com/ruleset");
        let json = RulesetSource::classify(u.clone(), fetched("rules: {}", Some("application/json")));
        assert!(matches!(json, RulesetSource::Json { .. }));

        let yaml = RulesetSource::classify(
            u.clone(),
            fetched(r#"{"rules":{}}"#, Some("application/x-yaml; charset=utf-8")),
        );
        assert!(matches!(yaml, RulesetSource::Yaml { .. }));

        let vendor = RulesetSource::classify(u, fetched("{}", Some("application/vnd.api+json")));
        assert!(matches!(vendor, RulesetSource::Json { .. }));
    }

    #[test]
    fn classify_by_sniffing() {
        let u = url("https://example.com/ruleset");
        let json = RulesetSource::classify(u.clone(), fetched(r#" {"rules":{}}"#, Some("text/plain")));
        assert!(matches!(json, RulesetSource::Json { .. }));
        let yaml = RulesetSource::classify(u, fetched("rules:\n  r: true\n", None));
        assert!(matches!(yaml, RulesetSource::Yaml { .. }));
    }

    #[test]
    fn yaml_is_converted_to_equivalent_json() {
        let yaml = "rules:\n  info-contact:\n    given: $.info\n    then:\n      field: contact\n      function: truthy\n";
        let source = RulesetSource::Yaml {
            url: url("https://example.com/r.yaml"),
            text: yaml.to_string(),
        };
        let json: Value = serde_json::from_str(&source.to_json_text()).unwrap();
        let expected: Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(json, expected);
        assert_eq!(json["rules"]["info-contact"]["then"]["function"], "truthy");
    }

    #[test]
    fn invalid_yaml_passes_through() {
        let source = RulesetSource::Yaml {
            url: url("https://example.com/r.yaml"),
            text: "rules: [unclosed".to_string(),
        };
        assert_eq!(source.to_json_text(), "rules: [unclosed");
    }

    #[test]
    fn literal_is_unchanged() {
        let source = RulesetSource::Literal("rules: {}".into());
        assert_eq!(source.to_json_text(), "rules: {}");
        assert!(source.url().is_none());
    }

    #[tokio::test]
    async fn literal_references_never_fetch() {
        let fetcher = Arc::new(StaticFetcher::new());
        let resolver = RulesetResolver::new(fetcher.clone());

        for reference in [
            r#"{"rules":{}}"#,
            "rules: {}",
            "ftp://example.com/ruleset.yaml",
            "file:///tmp/ruleset.yaml",
        ] {
            let source = resolver.resolve(reference).await.unwrap();
            assert_eq!(source, RulesetSource::Literal(reference.to_string()));
        }
        assert_eq!(fetcher.calls().len(), 0);
    }

    #[tokio::test]
    async fn remote_references_fetch_once() {
        let fetcher = Arc::new(
            StaticFetcher::new().with("https://example.com/r.yaml", "rules: {}\n", Some("text/yaml")),
        );
        let resolver = RulesetResolver::new(fetcher.clone());

        let source = resolver.resolve("https://example.com/r.yaml").await.unwrap();
        assert!(matches!(source, RulesetSource::Yaml { .. }));
        assert_eq!(source.to_json_text(), r#"{"rules":{}}"#);
        assert_eq!(fetcher.calls(), ["https://example.com/r.yaml"]);
    }

    #[tokio::test]
    async fn missing_remote_ruleset_is_not_found() {
        let resolver = RulesetResolver::new(Arc::new(StaticFetcher::new()));
        let err = resolver
            .resolve("https://example.com/missing.yaml")
            .await
            .unwrap_err();
        match err {
            RulesetError::NotFound { url } => assert_eq!(url, "https://example.com/missing.yaml"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn not_found_names_the_reference_as_written() {
        let fetcher = Arc::new(StaticFetcher::new());
        let resolver = RulesetResolver::new(fetcher.clone());
        let reference = "https://EXAMPLE.com/team/My Rules.yaml";
        let err = resolver.resolve(reference).await.unwrap_err();
        match err {
            RulesetError::NotFound { url } => assert_eq!(url, reference),
            other => panic!("expected NotFound, got {:?}", other),
        }
        assert_eq!(fetcher.calls(), ["https://example.com/team/My%20Rules.yaml"]);
        assert_eq!(
            RulesetError::NotFound {
                url: reference.to_string()
            }
            .to_string(),
            "No ruleset found at location: https://EXAMPLE.com/team/My Rules.yaml"
        );
    }

    #[tokio::test]
    async fn cache_serves_repeated_fetches() {
        let fetcher = Arc::new(
            StaticFetcher::new().with("https://example.com/r.json", r#"{"rules":{}}"#, None),
        );
        let resolver = RulesetResolver::new(fetcher.clone())
            .with_cache(Some(RulesetCache::new(Duration::from_secs(60))));

        let first = resolver.resolve("https://example.com/r.json").await.unwrap();
        let second = resolver.resolve("https://example.com/r.json").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn cache_does_not_store_failures() {
        let fetcher = Arc::new(StaticFetcher::new());
        let resolver = RulesetResolver::new(fetcher.clone())
            .with_cache(Some(RulesetCache::new(Duration::from_secs(60))));

        assert!(resolver.resolve("https://example.com/missing").await.is_err());
        assert!(resolver.resolve("https://example.com/missing").await.is_err());
        assert_eq!(fetcher.calls().len(), 2);
        assert!(resolver.cache().unwrap().is_empty());
    }
}
