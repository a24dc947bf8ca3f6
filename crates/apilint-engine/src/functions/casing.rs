use regex_lite::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{FunctionContext, FunctionResult};

const DIGITS: &str = "{DIGITS}";

/// Supported casing styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasingType {
    Flat,
    Camel,
    Pascal,
    Kebab,
    Cobol,
    Snake,
    Macro,
}

impl CasingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
            Self::Kebab => "kebab",
            Self::Cobol => "cobol",
            Self::Snake => "snake",
            Self::Macro => "macro",
        }
    }

    fn template(self) -> &'static str {
        match self {
            Self::Flat => "[a-z][a-z{DIGITS}]*",
            Self::Camel => "[a-z][a-z{DIGITS}]*(?:[A-Z{DIGITS}](?:[a-z{DIGITS}]+|$))*",
            Self::Pascal => "[A-Z][a-z{DIGITS}]*(?:[A-Z{DIGITS}](?:[a-z{DIGITS}]+|$))*",
            Self::Kebab => "[a-z][a-z{DIGITS}]*(?:-[a-z{DIGITS}]+)*",
            Self::Cobol => "[A-Z][A-Z{DIGITS}]*(?:-[A-Z{DIGITS}]+)*",
            Self::Snake => "[a-z][a-z{DIGITS}]*(?:_[a-z{DIGITS}]+)*",
            Self::Macro => "[A-Z][A-Z{DIGITS}]*(?:_[A-Z{DIGITS}]+)*",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CasingOptions {
    #[serde(rename = "type")]
    casing: CasingType,
    #[serde(default)]
    disallow_digits: bool,
    #[serde(default)]
    separator: Option<SeparatorOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SeparatorOptions {
    char: String,
    #[serde(default)]
    allow_leading: bool,
}

/// `casing`: string values must follow a casing style.
#[derive(Debug)]
pub struct Casing {
    casing: CasingType,
    regex: Regex,
    /// Separator that is accepted on its own when leading separators are allowed.
    lone_separator: Option<String>,
}

impl Casing {
    pub fn compile(options: CasingOptions) -> Result<Self, String> {
        let digits = if options.disallow_digits { "" } else { "0-9" };
        let part = options.casing.template().replace(DIGITS, digits);

        let (expression, lone_separator) = match &options.separator {
            None => (format!("^(?:{})$", part), None),
            Some(separator) => {
                if separator.char.chars().count() != 1 {
                    return Err("casing separator must be a single character".into());
                }
                let sep = regex_lite::escape(&separator.char);
                let leading = if separator.allow_leading {
                    format!("(?:{})?", sep)
                } else {
                    String::new()
                };
                let expression = format!("^{}(?:{})(?:{}(?:{}))*$", leading, part, sep, part);
                let lone = separator.allow_leading.then(|| separator.char.clone());
                (expression, lone)
            }
        };

        let regex = Regex::new(&expression).map_err(|e| format!("invalid casing: {}", e))?;
        Ok(Self {
            casing: options.casing,
            regex,
            lone_separator,
        })
    }

    pub fn execute(&self, value: &Value, ctx: &FunctionContext<'_>) -> Vec<FunctionResult> {
        let Value::String(text) = value else {
            return Vec::new();
        };
        if self.lone_separator.as_deref() == Some(text.as_str()) {
            return Vec::new();
        }
        if self.regex.is_match(text) {
            return Vec::new();
        }
        vec![FunctionResult::new(format!(
            "{} must be {} case",
            ctx.subject(),
            self.casing.as_str()
        ))]
    }
}
