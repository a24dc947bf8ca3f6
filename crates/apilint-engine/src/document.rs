//! Document parsing and format detection.

use serde_json::Value;

/// A document format a rule can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Oas2,
    Oas3,
    Oas3_0,
    Oas3_1,
    AsyncApi2,
    AsyncApi3,
    JsonSchema,
}

impl DocumentFormat {
    /// Parse a format name as written in a ruleset.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "oas2" => Some(Self::Oas2),
            "oas3" => Some(Self::Oas3),
            "oas3.0" | "oas3_0" => Some(Self::Oas3_0),
            "oas3.1" | "oas3_1" => Some(Self::Oas3_1),
            "asyncapi2" => Some(Self::AsyncApi2),
            "asyncapi3" => Some(Self::AsyncApi3),
            "json-schema" | "jsonSchema" => Some(Self::JsonSchema),
            _ => None,
        }
    }

    /// Whether a parsed document root is of this format.
    pub fn detect(self, root: &Value) -> bool {
        // `swagger: 2.0` in YAML is a number, not a string.
        let version = |key: &str| match root.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        match self {
            Self::Oas2 => version("swagger").is_some_and(|v| v.starts_with("2.")),
            Self::Oas3 => version("openapi").is_some_and(|v| v.starts_with("3.")),
            Self::Oas3_0 => version("openapi").is_some_and(|v| v.starts_with("3.0")),
            Self::Oas3_1 => version("openapi").is_some_and(|v| v.starts_with("3.1")),
            Self::AsyncApi2 => version("asyncapi").is_some_and(|v| v.starts_with("2.")),
            Self::AsyncApi3 => version("asyncapi").is_some_and(|v| v.starts_with("3.")),
            Self::JsonSchema => version("$schema").is_some_and(|v| v.contains("json-schema.org")),
        }
    }
}

/// A parsed document ready to be linted.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Parse JSON or YAML document text.
    pub fn parse(text: &str) -> Result<Self, String> {
        // Parse YAML (also handles JSON since JSON is valid YAML)
        let root: Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        Ok(Self { root })
    }

    /// Wrap an already parsed value.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Whether the document matches any of `formats`.
    pub fn is_any_of(&self, formats: &[DocumentFormat]) -> bool {
        formats.iter().any(|f| f.detect(&self.root))
    }
}
