//! Core ruleset functions.
//!
//! A function is compiled once from its name and `functionOptions`, then
//! executed against every lint target. A target is `None` when the rule's
//! `field` does not exist on the matched node.

mod casing;
mod collection;
mod pattern;
mod schema;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::path::{is_truthy, NodePath, PathSegment};

pub use casing::{Casing, CasingType};
pub use collection::{Alphabetical, Enumeration, Length, Properties};
pub use pattern::Pattern;
pub use schema::Schema;

/// Names of every function the engine provides.
pub const CORE_FUNCTIONS: &[&str] = &[
    "truthy",
    "falsy",
    "defined",
    "undefined",
    "pattern",
    "enumeration",
    "length",
    "casing",
    "alphabetical",
    "schema",
    "xor",
    "or",
];

/// Context passed to every function execution.
#[derive(Debug, Clone, Copy)]
pub struct FunctionContext<'a> {
    /// Location of the target in the document.
    pub path: &'a [PathSegment],
}

impl FunctionContext<'_> {
    /// Subject used in messages: `"name" property`, or `Value` at the root.
    pub fn subject(&self) -> String {
        match self.path.last() {
            Some(segment) => format!("\"{}\" property", segment),
            None => "Value".to_string(),
        }
    }
}

/// One violation reported by a function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    pub message: String,
    /// Extra path below the target, for violations located deeper in it.
    pub path: NodePath,
}

impl FunctionResult {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn at(message: impl Into<String>, path: NodePath) -> Self {
        Self {
            message: message.into(),
            path,
        }
    }
}

/// A compiled function with validated options.
#[derive(Debug)]
pub enum Function {
    Truthy,
    Falsy,
    Defined,
    Undefined,
    Pattern(Pattern),
    Enumeration(Enumeration),
    Length(Length),
    Casing(Casing),
    Alphabetical(Alphabetical),
    Schema(Schema),
    Xor(Properties),
    Or(Properties),
}

impl Function {
    /// Compile a function from its name and options.
    pub fn compile(name: &str, options: Option<&Value>) -> Result<Self, String> {
        let options = options.filter(|o| !o.is_null());
        let function = match name {
            "truthy" | "falsy" | "defined" | "undefined" => {
                if options.is_some() {
                    return Err(format!("function '{}' does not accept options", name));
                }
                match name {
                    "truthy" => Self::Truthy,
                    "falsy" => Self::Falsy,
                    "defined" => Self::Defined,
                    _ => Self::Undefined,
                }
            }
            "pattern" => Self::Pattern(Pattern::compile(parse_options(name, options)?)?),
            "enumeration" => {
                Self::Enumeration(Enumeration::compile(parse_options(name, options)?)?)
            }
            "length" => Self::Length(Length::compile(parse_options(name, options)?)?),
            "casing" => Self::Casing(Casing::compile(parse_options(name, options)?)?),
            "alphabetical" => Self::Alphabetical(Alphabetical::compile(parse_options(
                name, options,
            )?)),
            "schema" => Self::Schema(Schema::compile(parse_options(name, options)?)?),
            "xor" => Self::Xor(Properties::compile(parse_options(name, options)?, 2)?),
            "or" => Self::Or(Properties::compile(parse_options(name, options)?, 1)?),
            other => {
                return Err(format!(
                    "unknown function '{}' (available: {})",
                    other,
                    CORE_FUNCTIONS.join(", ")
                ))
            }
        };
        Ok(function)
    }

    /// Function name as written in rulesets.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Truthy => "truthy",
            Self::Falsy => "falsy",
            Self::Defined => "defined",
            Self::Undefined => "undefined",
            Self::Pattern(_) => "pattern",
            Self::Enumeration(_) => "enumeration",
            Self::Length(_) => "length",
            Self::Casing(_) => "casing",
            Self::Alphabetical(_) => "alphabetical",
            Self::Schema(_) => "schema",
            Self::Xor(_) => "xor",
            Self::Or(_) => "or",
        }
    }

    /// Run the function against a target.
    pub fn execute(&self, target: Option<&Value>, ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        match self {
            Self::Truthy => match target {
                Some(value) if is_truthy(value) => Vec::new(),
                _ => vec![FunctionResult::new(format!("{} must be truthy", ctx.subject()))],
            },
            Self::Falsy => match target {
                Some(value) if is_truthy(value) => {
                    vec![FunctionResult::new(format!("{} must be falsy", ctx.subject()))]
                }
                _ => Vec::new(),
            },
            Self::Defined => match target {
                Some(_) => Vec::new(),
                None => vec![FunctionResult::new(format!("{} must be defined", ctx.subject()))],
            },
            Self::Undefined => match target {
                Some(_) => {
                    vec![FunctionResult::new(format!("{} must be undefined", ctx.subject()))]
                }
                None => Vec::new(),
            },
            Self::Schema(schema) => schema.execute(target, ctx),
            other => match target {
                // Remaining functions only inspect values that exist.
                None => Vec::new(),
                Some(value) => match other {
                    Self::Pattern(f) => f.execute(value, ctx),
                    Self::Enumeration(f) => f.execute(value, ctx),
                    Self::Length(f) => f.execute(value, ctx),
                    Self::Casing(f) => f.execute(value, ctx),
                    Self::Alphabetical(f) => f.execute(value, ctx),
                    Self::Xor(f) => f.execute_xor(value),
                    Self::Or(f) => f.execute_or(value),
                    Self::Truthy | Self::Falsy | Self::Defined | Self::Undefined | Self::Schema(_) => {
                        Vec::new()
                    }
                },
            },
        }
    }
}

fn parse_options<T: DeserializeOwned>(name: &str, options: Option<&Value>) -> Result<T, String> {
    let value = options
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    serde_json::from_value(value).map_err(|e| format!("invalid options for '{}': {}", name, e))
}

/// Render a value for messages: strings verbatim, everything else as JSON.
pub(crate) fn print_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(_) => "Array[]".to_string(),
        Value::Object(_) => "Object{}".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(function: &Function, target: Option<&Value>) -> Vec<String> {
        let path = vec![PathSegment::from("description")];
        let ctx = FunctionContext { path: &path };
        function
            .execute(target, &ctx)
            .into_iter()
            .map(|r| r.message)
            .collect()
    }

    #[test]
    fn truthy_and_falsy() {
        let truthy = Function::compile("truthy", None).unwrap();
        assert!(run(&truthy, Some(&json!("text"))).is_empty());
        assert_eq!(
            run(&truthy, Some(&json!(""))),
            ["\"description\" property must be truthy"]
        );
        assert_eq!(run(&truthy, None).len(), 1);

        let falsy = Function::compile("falsy", None).unwrap();
        assert!(run(&falsy, None).is_empty());
        assert!(run(&falsy, Some(&json!(false))).is_empty());
        assert_eq!(run(&falsy, Some(&json!(true))).len(), 1);
    }

    #[test]
    fn defined_and_undefined() {
        let defined = Function::compile("defined", None).unwrap();
        assert!(run(&defined, Some(&json!(null))).is_empty());
        assert_eq!(run(&defined, None), ["\"description\" property must be defined"]);

        let undefined = Function::compile("undefined", None).unwrap();
        assert!(run(&undefined, None).is_empty());
        assert_eq!(run(&undefined, Some(&json!(1))).len(), 1);
    }

    #[test]
    fn root_subject() {
        let truthy = Function::compile("truthy", None).unwrap();
        let ctx = FunctionContext { path: &[] };
        let results = truthy.execute(Some(&json!(0)), &ctx);
        assert_eq!(results[0].message, "Value must be truthy");
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = Function::compile("oasOpSuccessResponse", None).unwrap_err();
        assert!(err.contains("unknown function"));
    }

    #[test]
    fn options_on_optionless_function_are_rejected() {
        let err = Function::compile("truthy", Some(&json!({"x": 1}))).unwrap_err();
        assert!(err.contains("does not accept options"));
        assert!(Function::compile("truthy", Some(&Value::Null)).is_ok());
    }

    #[test]
    fn value_dependent_functions_skip_missing_targets() {
        let pattern = Function::compile("pattern", Some(&json!({"match": "^a"}))).unwrap();
        assert!(run(&pattern, None).is_empty());
        assert_eq!(pattern.name(), "pattern");
    }
}
