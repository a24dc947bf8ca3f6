use serde::Serialize;

use crate::path::NodePath;
use crate::severity::DiagnosticSeverity;

/// One lint finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    /// Rule name, or `parser` for unreadable documents.
    pub code: String,
    pub message: String,
    /// Location in the document; empty for the root.
    pub path: NodePath,
    pub severity: DiagnosticSeverity,
}

impl Diagnostic {
    /// Diagnostic reported when the document cannot be parsed.
    pub fn parser(message: impl Into<String>) -> Self {
        Self {
            code: "parser".to_string(),
            message: message.into(),
            path: Vec::new(),
            severity: DiagnosticSeverity::Error,
        }
    }
}
