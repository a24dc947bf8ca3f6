use thiserror::Error;

/// Errors produced while parsing or compiling a ruleset.
///
/// Every variant means the ruleset cannot be executed; documents never cause
/// an `EngineError` (parse failures surface as `parser` diagnostics).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The ruleset text is not valid JSON/YAML or has the wrong shape.
    #[error("invalid ruleset: {0}")]
    InvalidRuleset(String),

    /// A single rule failed to compile.
    #[error("invalid rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    /// A JSONPath expression could not be parsed.
    #[error("invalid JSONPath expression '{expression}': {reason}")]
    InvalidPath { expression: String, reason: String },
}

impl EngineError {
    pub(crate) fn rule(rule: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}
