use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

use super::{print_value, FunctionContext, FunctionResult};
use crate::path::PathSegment;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumerationOptions {
    values: Vec<Value>,
}

/// `enumeration`: primitive values must be one of a fixed set.
#[derive(Debug)]
pub struct Enumeration {
    values: Vec<Value>,
}

impl Enumeration {
    pub fn compile(options: EnumerationOptions) -> Result<Self, String> {
        if options.values.is_empty() {
            return Err("'enumeration' requires at least one value".into());
        }
        Ok(Self {
            values: options.values,
        })
    }

    pub fn execute(&self, value: &Value, _ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        if value.is_object() || value.is_array() || self.values.contains(value) {
            return Vec::new();
        }
        let allowed: Vec<String> = self.values.iter().map(print_value).collect();
        vec![FunctionResult::new(format!(
            "\"{}\" must be equal to one of the allowed values: {}",
            print_value(value),
            allowed.join(", ")
        ))]
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LengthOptions {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

/// `length`: bounds on string length, array/object size or numeric value.
#[derive(Debug)]
pub struct Length {
    min: Option<f64>,
    max: Option<f64>,
}

impl Length {
    pub fn compile(options: LengthOptions) -> Result<Self, String> {
        match (options.min, options.max) {
            (None, None) => Err("'length' requires 'min' or 'max'".into()),
            (Some(min), Some(max)) if min > max => {
                Err(format!("'length' min ({}) is greater than max ({})", min, max))
            }
            (min, max) => Ok(Self { min, max }),
        }
    }

    pub fn execute(&self, value: &Value, ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        let measured = match value {
            Value::String(s) => s.chars().count() as f64,
            Value::Array(items) => items.len() as f64,
            Value::Object(map) => map.len() as f64,
            Value::Number(n) => match n.as_f64() {
                Some(n) => n,
                None => return Vec::new(),
            },
            Value::Bool(_) | Value::Null => return Vec::new(),
        };

        let mut results = Vec::new();
        if let Some(min) = self.min {
            if measured < min {
                results.push(FunctionResult::new(format!(
                    "{} must not be shorter than {}",
                    ctx.subject(),
                    min
                )));
            }
        }
        if let Some(max) = self.max {
            if measured > max {
                results.push(FunctionResult::new(format!(
                    "{} must not be longer than {}",
                    ctx.subject(),
                    max
                )));
            }
        }
        results
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AlphabeticalOptions {
    #[serde(default)]
    keyed_by: Option<String>,
}

/// `alphabetical`: array items or object keys must be sorted.
#[derive(Debug)]
pub struct Alphabetical {
    keyed_by: Option<String>,
}

impl Alphabetical {
    pub fn compile(options: AlphabeticalOptions) -> Self {
        Self {
            keyed_by: options.keyed_by,
        }
    }

    pub fn execute(&self, value: &Value, ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        match value {
            Value::Object(map) => {
                let keys: Vec<&String> = map.keys().collect();
                let unsorted = keys
                    .windows(2)
                    .position(|pair| compare_text(pair[0], pair[1]) == Ordering::Greater);
                match unsorted {
                    Some(index) => vec![FunctionResult::at(
                        format!("{} must be sorted alphabetically", ctx.subject()),
                        vec![PathSegment::Key(keys[index].clone())],
                    )],
                    None => Vec::new(),
                }
            }
            Value::Array(items) => {
                let sort_keys: Vec<Option<&Value>> = items
                    .iter()
                    .map(|item| match &self.keyed_by {
                        Some(key) => item.get(key.as_str()),
                        None => Some(item),
                    })
                    .collect();
                let unsorted = sort_keys
                    .windows(2)
                    .position(|pair| compare_values(pair[0], pair[1]) == Ordering::Greater);
                match unsorted {
                    Some(index) => vec![FunctionResult::at(
                        format!("{} must be sorted alphabetically", ctx.subject()),
                        vec![PathSegment::Index(index)],
                    )],
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => compare_text(&print_value(x), &print_value(y)),
        // Items without the key sort first.
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertiesOptions {
    properties: Vec<String>,
}

/// Property list shared by `xor` and `or`.
#[derive(Debug)]
pub struct Properties {
    properties: Vec<String>,
}

impl Properties {
    pub fn compile(options: PropertiesOptions, minimum: usize) -> Result<Self, String> {
        if options.properties.len() < minimum {
            return Err(format!(
                "'properties' must list at least {} name(s)",
                minimum
            ));
        }
        Ok(Self {
            properties: options.properties,
        })
    }

    fn defined_count(&self, value: &Value) -> Option<usize> {
        let map = value.as_object()?;
        Some(
            self.properties
                .iter()
                .filter(|p| map.contains_key(p.as_str()))
                .count(),
        )
    }

    fn quoted(&self) -> String {
        let quoted: Vec<String> = self.properties.iter().map(|p| format!("\"{}\"", p)).collect();
        quoted.join(", ")
    }

    /// Exactly one of the properties must be defined.
    pub fn execute_xor(&self, value: &Value) -> Vec<FunctionResult> {
        match self.defined_count(value) {
            Some(1) | None => Vec::new(),
            Some(_) => vec![FunctionResult::new(format!(
                "exactly one of {} must be defined",
                self.quoted()
            ))],
        }
    }

    /// At least one of the properties must be defined.
    pub fn execute_or(&self, value: &Value) -> Vec<FunctionResult> {
        match self.defined_count(value) {
            Some(0) => vec![FunctionResult::new(format!(
                "at least one of {} must be defined",
                self.quoted()
            ))],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> FunctionContext<'static> {
        FunctionContext { path: &[] }
    }

    fn options<T: serde::de::DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn enumeration() {
        let f = Enumeration::compile(options(json!({"values": ["http", "https", 1]}))).unwrap();
        assert!(f.execute(&json!("https"), &ctx()).is_empty());
        assert!(f.execute(&json!(1), &ctx()).is_empty());
        assert!(f.execute(&json!({"a": 1}), &ctx()).is_empty());
        let results = f.execute(&json!("ftp"), &ctx());
        assert_eq!(
            results[0].message,
            "\"ftp\" must be equal to one of the allowed values: http, https, 1"
        );
        assert!(Enumeration::compile(options(json!({"values": []}))).is_err());
    }

    #[test]
    fn length_bounds() {
        let f = Length::compile(options(json!({"min": 2, "max": 4}))).unwrap();
        assert!(f.execute(&json!("abc"), &ctx()).is_empty());
        assert!(f.execute(&json!([1, 2]), &ctx()).is_empty());
        assert_eq!(
            f.execute(&json!("a"), &ctx())[0].message,
            "Value must not be shorter than 2"
        );
        assert_eq!(
            f.execute(&json!({"a":1,"b":2,"c":3,"d":4,"e":5}), &ctx())[0].message,
            "Value must not be longer than 4"
        );
        assert_eq!(f.execute(&json!(10), &ctx()).len(), 1);
        assert!(f.execute(&json!(true), &ctx()).is_empty());
    }

    #[test]
    fn length_counts_characters() {
        let f = Length::compile(options(json!({"max": 3}))).unwrap();
        assert!(f.execute(&json!("日本語"), &ctx()).is_empty());
    }

    #[test]
    fn length_requires_a_bound() {
        assert!(Length::compile(options(json!({}))).is_err());
        assert!(Length::compile(options(json!({"min": 5, "max": 1}))).is_err());
    }

    #[test]
    fn alphabetical_object_keys() {
        let f = Alphabetical::compile(AlphabeticalOptions::default());
        assert!(f.execute(&json!({"alpha": 1, "Beta": 2, "gamma": 3}), &ctx()).is_empty());
        let results = f.execute(&json!({"beta": 1, "alpha": 2}), &ctx());
        assert_eq!(results[0].path, vec![PathSegment::Key("beta".into())]);
    }

    #[test]
    fn alphabetical_arrays() {
        let plain = Alphabetical::compile(AlphabeticalOptions::default());
        assert!(plain.execute(&json!(["a", "b", "c"]), &ctx()).is_empty());
        assert!(plain.execute(&json!([1, 2, 10]), &ctx()).is_empty());
        let results = plain.execute(&json!(["a", "c", "b"]), &ctx());
        assert_eq!(results[0].path, vec![PathSegment::Index(1)]);

        let keyed = Alphabetical::compile(options(json!({"keyedBy": "name"})));
        assert!(keyed
            .execute(&json!([{"name": "pets"}, {"name": "users"}]), &ctx())
            .is_empty());
        assert_eq!(
            keyed
                .execute(&json!([{"name": "users"}, {"name": "pets"}]), &ctx())
                .len(),
            1
        );
    }

    #[test]
    fn xor_and_or() {
        let xor = Properties::compile(options(json!({"properties": ["value", "externalValue"]})), 2)
            .unwrap();
        assert!(xor.execute_xor(&json!({"value": 1})).is_empty());
        assert_eq!(
            xor.execute_xor(&json!({"value": 1, "externalValue": 2}))[0].message,
            "exactly one of \"value\", \"externalValue\" must be defined"
        );
        assert_eq!(xor.execute_xor(&json!({})).len(), 1);
        assert!(xor.execute_xor(&json!("not an object")).is_empty());

        let or = Properties::compile(options(json!({"properties": ["a", "b"]})), 1).unwrap();
        assert!(or.execute_or(&json!({"b": null})).is_empty());
        assert_eq!(or.execute_or(&json!({"c": 1})).len(), 1);

        assert!(Properties::compile(options(json!({"properties": ["a"]})), 2).is_err());
    }
}
