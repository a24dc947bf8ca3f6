//! Minimal Spectral-style linting engine.
//!
//! Executes rulesets (`rules`, `given`, `then`, `field`, `function`,
//! `functionOptions`, `aliases`, `formats`) against JSON or YAML documents and
//! produces engine-native [`Diagnostic`]s. Rulesets are compiled once per
//! request: JSONPath expressions are parsed and function options validated
//! before the document is touched.
//!
//! `extends` bundling is not performed here; the ruleset loader fetches parent
//! rulesets and merges them through [`BundledRuleset`].

pub mod definition;
pub mod diagnostic;
pub mod document;
pub mod error;
pub mod functions;
pub mod lint;
pub mod path;
pub mod ruleset;
pub mod severity;

pub use definition::{
    ExtendsEntry, ExtendsMode, OneOrMany, RuleDefinition, RuleEntry, RulesetDefinition,
    SeverityValue, ThenDefinition,
};
pub use diagnostic::Diagnostic;
pub use document::{Document, DocumentFormat};
pub use error::EngineError;
pub use lint::lint;
pub use path::{JsonPath, NodePath, PathSegment};
pub use ruleset::{BundledRuleset, Rule, RuleSource, Ruleset};
pub use severity::DiagnosticSeverity;
