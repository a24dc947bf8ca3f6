use apilint_engine::EngineError;
use thiserror::Error;

/// Errors from fetching a remote ruleset.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered 404.
    #[error("No ruleset found at location: {url}")]
    NotFound { url: String },

    /// Any other non-success status.
    #[error("fetching {url} failed: {status}")]
    Status { url: String, status: String },

    /// Connection, TLS, timeout or body read failure.
    #[error("fetching {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors from resolving and loading a ruleset.
#[derive(Debug, Error)]
pub enum RulesetError {
    /// The top-level ruleset URL answered 404.
    #[error("No ruleset found at location: {url}")]
    NotFound { url: String },

    /// The top-level ruleset URL could not be fetched.
    #[error(transparent)]
    Fetch(FetchError),

    /// The ruleset content is not a valid ruleset.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A ruleset extends itself, directly or through others.
    #[error("invalid ruleset: circular extends ({chain})")]
    Cycle { chain: String },

    /// `extends` chains are nested too deeply.
    #[error("invalid ruleset: extends nested deeper than {max} levels")]
    TooDeep { max: usize },

    /// Built-in `spectral:*` rulesets are not bundled.
    #[error("invalid ruleset: built-in ruleset '{reference}' is not available")]
    Unsupported { reference: String },

    /// An `extends` reference could not be loaded.
    #[error("failed to load extended ruleset '{reference}': {reason}")]
    Extends { reference: String, reason: String },
}

impl RulesetError {
    /// Whether the error is a problem with the ruleset content itself.
    pub fn is_invalid_ruleset(&self) -> bool {
        matches!(
            self,
            Self::Engine(_) | Self::Cycle { .. } | Self::TooDeep { .. } | Self::Unsupported { .. }
        )
    }
}

impl From<FetchError> for RulesetError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::NotFound { url } => Self::NotFound { url },
            other => Self::Fetch(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_url() {
        let err: RulesetError = FetchError::NotFound {
            url: "https://example.com/missing.yaml".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "No ruleset found at location: https://example.com/missing.yaml"
        );
        assert!(!err.is_invalid_ruleset());
    }

    #[test]
    fn status_errors_stay_fetch_errors() {
        let err: RulesetError = FetchError::Status {
            url: "https://example.com/r.yaml".into(),
            status: "500 Internal Server Error".into(),
        }
        .into();
        assert!(matches!(err, RulesetError::Fetch(_)));
        assert!(err.to_string().contains("500 Internal Server Error"));
    }

    #[test]
    fn classification() {
        let engine = RulesetError::from(EngineError::InvalidRuleset("bad".into()));
        assert!(engine.is_invalid_ruleset());
        assert!(RulesetError::Cycle { chain: "a -> a".into() }.is_invalid_ruleset());
        assert!(!RulesetError::Extends {
            reference: "https://example.com/base.yaml".into(),
            reason: "timeout".into()
        }
        .is_invalid_ruleset());
    }
}
