//! Engine-native diagnostic severity.

use serde::Serialize;

/// Severity of a diagnostic, from most (`Error = 0`) to least (`Hint = 3`) severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum DiagnosticSeverity {
    Error = 0,
    #[default]
    Warning = 1,
    Information = 2,
    Hint = 3,
}

impl DiagnosticSeverity {
    /// Numeric code on the 0..=3 scale.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Convert a numeric code back into a severity.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::Warning),
            2 => Some(Self::Information),
            3 => Some(Self::Hint),
            _ => None,
        }
    }

    /// Parse a ruleset severity name (`error`, `warn`, `info`, `hint`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warning),
            "info" | "information" => Some(Self::Information),
            "hint" => Some(Self::Hint),
            _ => None,
        }
    }

    /// Ruleset-style name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl From<DiagnosticSeverity> for u8 {
    fn from(severity: DiagnosticSeverity) -> Self {
        severity.code()
    }
}
