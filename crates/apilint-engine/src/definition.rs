//! Serde model of a ruleset document.
//!
//! A ruleset is parsed from YAML or JSON text (JSON is valid YAML). Rule
//! entries are converted one by one so that an error names the offending rule
//! instead of failing with a generic "did not match any variant" message.

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::EngineError;
use crate::severity::DiagnosticSeverity;

/// Top-level keys a ruleset may declare.
const RULESET_KEYS: &[&str] = &[
    "extends",
    "formats",
    "aliases",
    "rules",
    "description",
    "documentationUrl",
    "parserOptions",
];

/// A value that may be given either as a single item or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }

    pub fn to_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }
}

/// A rule severity as written in a ruleset: a level, or `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityValue {
    Level(DiagnosticSeverity),
    Off,
}

impl SeverityValue {
    fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("off") {
            return Some(Self::Off);
        }
        DiagnosticSeverity::parse(name).map(Self::Level)
    }

    fn from_code(code: i64) -> Option<Self> {
        if code == -1 {
            return Some(Self::Off);
        }
        DiagnosticSeverity::from_code(code).map(Self::Level)
    }
}

impl<'de> Deserialize<'de> for SeverityValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Code(i64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Name(name) => Self::from_name(&name)
                .ok_or_else(|| de::Error::custom(format!("unknown severity '{}'", name))),
            Raw::Code(code) => Self::from_code(code)
                .ok_or_else(|| de::Error::custom(format!("severity {} is out of range", code))),
        }
    }
}

/// How rules of an extended ruleset are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtendsMode {
    /// Every rule is enabled.
    All,
    /// Only rules not marked `recommended: false` are enabled.
    #[default]
    Recommended,
    /// Every rule is disabled; the extending ruleset may re-enable some.
    Off,
}

/// One entry of `extends`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendsEntry {
    pub reference: String,
    pub mode: ExtendsMode,
}

impl<'de> Deserialize<'de> for ExtendsEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Reference(String),
            WithMode((String, ExtendsMode)),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Reference(reference) => Self {
                reference,
                mode: ExtendsMode::default(),
            },
            Raw::WithMode((reference, mode)) => Self { reference, mode },
        })
    }
}

/// One `then` clause of a rule.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThenDefinition {
    #[serde(default)]
    pub field: Option<String>,
    pub function: String,
    #[serde(default)]
    pub function_options: Option<Value>,
}

/// A full rule definition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<SeverityValue>,
    #[serde(default = "default_recommended")]
    pub recommended: bool,
    pub given: OneOrMany<String>,
    pub then: OneOrMany<ThenDefinition>,
    #[serde(default)]
    pub formats: Option<Vec<String>>,
    #[serde(default)]
    pub documentation_url: Option<String>,
    /// Accepted for compatibility; documents are always linted unresolved.
    #[serde(default)]
    pub resolved: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_recommended() -> bool {
    true
}

/// An entry under `rules`.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleEntry {
    /// `true` / `false`: enable or disable an inherited rule.
    Toggle(bool),
    /// A bare severity: override an inherited rule's severity.
    Severity(SeverityValue),
    /// A new (or replacing) rule definition.
    Definition(Box<RuleDefinition>),
}

impl RuleEntry {
    fn from_value(name: &str, value: Value) -> Result<Self, EngineError> {
        match value {
            Value::Bool(enabled) => Ok(Self::Toggle(enabled)),
            Value::String(_) | Value::Number(_) => serde_json::from_value(value)
                .map(Self::Severity)
                .map_err(|e| EngineError::rule(name, e.to_string())),
            Value::Object(_) => serde_json::from_value(value)
                .map(|definition| Self::Definition(Box::new(definition)))
                .map_err(|e| EngineError::rule(name, e.to_string())),
            other => Err(EngineError::rule(
                name,
                format!("expected a rule definition, boolean or severity, got {}", other),
            )),
        }
    }
}

/// A parsed ruleset document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesetDefinition {
    pub extends: Vec<ExtendsEntry>,
    pub formats: Option<Vec<String>>,
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Rule entries in declaration order.
    pub rules: Vec<(String, RuleEntry)>,
}

impl RulesetDefinition {
    /// Parse ruleset text (YAML or JSON).
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        // Parse YAML (also handles JSON since JSON is valid YAML)
        let root: Value =
            serde_yaml::from_str(text).map_err(|e| EngineError::InvalidRuleset(e.to_string()))?;
        Self::from_value(root)
    }

    /// Build a ruleset definition from an already parsed value.
    pub fn from_value(root: Value) -> Result<Self, EngineError> {
        let Value::Object(mut root) = root else {
            return Err(EngineError::InvalidRuleset(
                "ruleset root must be an object".into(),
            ));
        };

        if root.contains_key("functions") || root.contains_key("functionsDir") {
            return Err(EngineError::InvalidRuleset(
                "custom functions are not supported".into(),
            ));
        }
        if root.contains_key("overrides") {
            return Err(EngineError::InvalidRuleset(
                "'overrides' is not supported".into(),
            ));
        }
        if let Some(key) = root.keys().find(|k| !RULESET_KEYS.contains(&k.as_str())) {
            return Err(EngineError::InvalidRuleset(format!(
                "unknown ruleset property '{}'",
                key
            )));
        }
        if !root.contains_key("rules") && !root.contains_key("extends") {
            return Err(EngineError::InvalidRuleset(
                "ruleset must define 'rules' or 'extends'".into(),
            ));
        }

        let extends = match root.remove("extends") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value::<OneOrMany<ExtendsEntry>>(value)
                .map_err(|e| EngineError::InvalidRuleset(format!("invalid 'extends': {}", e)))?
                .into_vec(),
        };

        let formats = match root.remove("formats") {
            None | Some(Value::Null) => None,
            Some(value) => Some(
                serde_json::from_value::<Vec<String>>(value)
                    .map_err(|e| EngineError::InvalidRuleset(format!("invalid 'formats': {}", e)))?,
            ),
        };

        let aliases = match root.remove("aliases") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => serde_json::from_value::<BTreeMap<String, OneOrMany<String>>>(value)
                .map_err(|e| EngineError::InvalidRuleset(format!("invalid 'aliases': {}", e)))?
                .into_iter()
                .map(|(name, given)| (name, given.into_vec()))
                .collect(),
        };

        let rules = match root.remove("rules") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(name, value)| {
                    let entry = RuleEntry::from_value(&name, value)?;
                    Ok((name, entry))
                })
                .collect::<Result<Vec<_>, EngineError>>()?,
            Some(other) => {
                return Err(EngineError::InvalidRuleset(format!(
                    "'rules' must be an object, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            extends,
            formats,
            aliases,
            rules,
        })
    }
}
