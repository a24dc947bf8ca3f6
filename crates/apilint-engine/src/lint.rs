//! Rule execution.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::Value;

use crate::diagnostic::Diagnostic;
use crate::document::Document;
use crate::functions::{print_value, FunctionContext};
use crate::path::{closest_existing, to_pointer, value_at, Match, NodePath, PathSegment};
use crate::ruleset::{Field, Rule, Ruleset};

/// Lint document text (JSON or YAML) with a compiled ruleset.
///
/// A document that cannot be parsed yields a single `parser` diagnostic.
pub fn lint(ruleset: &Ruleset, text: &str) -> Vec<Diagnostic> {
    match Document::parse(text) {
        Ok(document) => ruleset.run(&document),
        Err(reason) => vec![Diagnostic::parser(reason)],
    }
}

/// A value a function is applied to.
struct Target<'a> {
    path: NodePath,
    value: Option<Cow<'a, Value>>,
}

impl Ruleset {
    /// Run every rule against a parsed document.
    pub fn run(&self, document: &Document) -> Vec<Diagnostic> {
        let root = document.root();
        let mut seen = HashSet::new();
        let mut diagnostics = Vec::new();

        for rule in &self.rules {
            if !rule.formats.is_empty() && !document.is_any_of(&rule.formats) {
                continue;
            }
            for given in &rule.given {
                for node in given.query(root) {
                    for then in &rule.then {
                        for target in targets(&node, then.field.as_ref()) {
                            let ctx = FunctionContext { path: &target.path };
                            let results = then.function.execute(target.value.as_deref(), &ctx);
                            for result in results {
                                let mut full = target.path.clone();
                                full.extend(result.path);
                                let message = render_message(rule, &result.message, root, &full);
                                let path = closest_existing(root, &full);
                                let diagnostic = Diagnostic {
                                    code: rule.name.clone(),
                                    message,
                                    path,
                                    severity: rule.severity,
                                };
                                if seen.insert(diagnostic.clone()) {
                                    diagnostics.push(diagnostic);
                                }
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!(
            rules = self.rules.len(),
            diagnostics = diagnostics.len(),
            "lint completed"
        );
        diagnostics
    }
}

/// Resolve `then.field` against a matched node.
fn targets<'a>(node: &Match<'a>, field: Option<&Field>) -> Vec<Target<'a>> {
    let container = node.value.is_object() || node.value.is_array();
    let field = match field {
        Some(field) if container => field,
        _ => {
            return vec![Target {
                path: node.path.clone(),
                value: Some(Cow::Borrowed(node.value)),
            }]
        }
    };

    let mut targets = Vec::new();
    match field {
        Field::Key => match node.value {
            Value::Object(map) => {
                for key in map.keys() {
                    targets.push(Target {
                        path: extend(&node.path, PathSegment::Key(key.clone())),
                        value: Some(Cow::Owned(Value::String(key.clone()))),
                    });
                }
            }
            Value::Array(items) => {
                for index in 0..items.len() {
                    targets.push(Target {
                        path: extend(&node.path, PathSegment::Index(index)),
                        value: Some(Cow::Owned(Value::String(index.to_string()))),
                    });
                }
            }
            _ => {}
        },
        Field::Path(path) => {
            for found in path.query(node.value) {
                let mut full = node.path.clone();
                full.extend(found.path);
                targets.push(Target {
                    path: full,
                    value: Some(Cow::Borrowed(found.value)),
                });
            }
        }
        Field::Property(segments) => {
            let mut path = node.path.clone();
            let mut current = Some(node.value);
            for raw in segments {
                let segment = match (current, raw.parse::<usize>()) {
                    (Some(Value::Array(_)), Ok(index)) => PathSegment::Index(index),
                    _ => PathSegment::Key(raw.clone()),
                };
                current = current.and_then(|value| value_at(value, std::slice::from_ref(&segment)));
                path.push(segment);
            }
            targets.push(Target {
                path,
                value: current.map(Cow::Borrowed),
            });
        }
    }

    if targets.is_empty() {
        targets.push(Target {
            path: node.path.clone(),
            value: None,
        });
    }
    targets
}

fn extend(path: &[PathSegment], segment: PathSegment) -> NodePath {
    let mut extended = path.to_vec();
    extended.push(segment);
    extended
}

/// Build the diagnostic message for one function result.
fn render_message(rule: &Rule, error: &str, root: &Value, path: &[PathSegment]) -> String {
    let Some(template) = &rule.message else {
        return rule.description.clone().unwrap_or_else(|| error.to_string());
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template.as_str();
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match after[..end].trim() {
            "error" => out.push_str(error),
            "description" => out.push_str(rule.description.as_deref().unwrap_or("")),
            "property" => {
                if let Some(last) = path.last() {
                    out.push_str(&last.to_string());
                }
            }
            "path" => out.push_str(&to_pointer(path)),
            "value" => {
                if let Some(value) = value_at(root, path) {
                    out.push_str(&print_value(value));
                }
            }
            _ => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
