use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use super::{FunctionContext, FunctionResult};
use crate::path::{NodePath, PathSegment};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SchemaOptions {
    schema: Value,
    #[serde(default)]
    all_errors: bool,
    /// Accepted for compatibility; the draft is taken from `$schema`.
    #[serde(default)]
    #[allow(dead_code)]
    dialect: Option<String>,
}

/// `schema`: values must validate against a JSON Schema.
pub struct Schema {
    validator: jsonschema::Validator,
    all_errors: bool,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("all_errors", &self.all_errors)
            .finish_non_exhaustive()
    }
}

impl Schema {
    pub fn compile(options: SchemaOptions) -> Result<Self, String> {
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(&options.schema)
            .map_err(|e| format!("invalid schema: {}", e))?;
        Ok(Self {
            validator,
            all_errors: options.all_errors,
        })
    }

    pub fn execute(&self, target: Option<&Value>, ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        let Some(value) = target else {
            return vec![FunctionResult::new(format!("{} must exist", ctx.subject()))];
        };

        let limit = if self.all_errors { usize::MAX } else { 1 };
        self.validator
            .iter_errors(value)
            .take(limit)
            .map(|error| {
                let path = pointer_segments(value, &error.instance_path.to_string());
                FunctionResult::at(error.to_string(), path)
            })
            .collect()
    }
}

/// Turn a JSON pointer relative to `value` into path segments.
fn pointer_segments(value: &Value, pointer: &str) -> NodePath {
    let mut node = Some(value);
    let mut segments = Vec::new();
    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        let segment = match (node, token.parse::<usize>()) {
            (Some(Value::Array(_)), Ok(index)) => PathSegment::Index(index),
            _ => PathSegment::Key(token),
        };
        node = node.and_then(|n| match (n, &segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
            _ => None,
        });
        segments.push(segment);
    }
    segments
}
