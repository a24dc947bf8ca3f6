use regex_lite::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{FunctionContext, FunctionResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternOptions {
    #[serde(rename = "match", default)]
    matches: Option<String>,
    #[serde(default)]
    not_match: Option<String>,
}

#[derive(Debug)]
struct CompiledPattern {
    source: String,
    regex: Regex,
}

/// `pattern`: string values must (not) match a regular expression.
#[derive(Debug)]
pub struct Pattern {
    matches: Option<CompiledPattern>,
    not_match: Option<CompiledPattern>,
}

impl Pattern {
    pub fn compile(options: PatternOptions) -> Result<Self, String> {
        if options.matches.is_none() && options.not_match.is_none() {
            return Err("'pattern' requires 'match' or 'notMatch'".into());
        }
        Ok(Self {
            matches: options.matches.as_deref().map(compile_regex).transpose()?,
            not_match: options.not_match.as_deref().map(compile_regex).transpose()?,
        })
    }

    pub fn execute(&self, value: &Value, _ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        let Value::String(text) = value else {
            return Vec::new();
        };
        let mut results = Vec::new();
        if let Some(pattern) = &self.matches {
            if !pattern.regex.is_match(text) {
                results.push(FunctionResult::new(format!(
                    "\"{}\" must match the pattern \"{}\"",
                    text, pattern.source
                )));
            }
        }
        if let Some(pattern) = &self.not_match {
            if pattern.regex.is_match(text) {
                results.push(FunctionResult::new(format!(
                    "\"{}\" must not match the pattern \"{}\"",
                    text, pattern.source
                )));
            }
        }
        results
    }
}

/// Compile a pattern, accepting the `/body/flags` form.
fn compile_regex(source: &str) -> Result<CompiledPattern, String> {
    let (body, flags) = split_delimited(source).unwrap_or((source, ""));
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' => inline.push(flag),
            // Global, unicode and sticky flags have no effect on a match test.
            'g' | 'u' | 'y' => {}
            other => return Err(format!("unsupported regex flag '{}' in {}", other, source)),
        }
    }
    let expression = if inline.is_empty() {
        body.to_string()
    } else {
        format!("(?{}){}", inline, body)
    };
    let regex =
        Regex::new(&expression).map_err(|e| format!("invalid pattern '{}': {}", source, e))?;
    Ok(CompiledPattern {
        source: source.to_string(),
        regex,
    })
}

fn split_delimited(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let flags = &rest[end + 1..];
    if flags.chars().all(|c| c.is_ascii_alphabetic()) {
        Some((&rest[..end], flags))
    } else {
        None
    }
}
