//! Neutral problem format returned to clients.

use serde::{Deserialize, Serialize};

use apilint_engine::{Diagnostic, DiagnosticSeverity, PathSegment};

/// Canonical problem severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemSeverity {
    High,
    Medium,
    Low,
    Ignore,
}

impl ProblemSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Ignore => "ignore",
        }
    }
}

impl From<DiagnosticSeverity> for ProblemSeverity {
    fn from(severity: DiagnosticSeverity) -> Self {
        match severity {
            DiagnosticSeverity::Error => Self::High,
            DiagnosticSeverity::Warning => Self::Medium,
            DiagnosticSeverity::Information => Self::Low,
            DiagnosticSeverity::Hint => Self::Ignore,
        }
    }
}

/// One problem found in a validated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationProblem {
    pub error_code: String,
    pub node_path: String,
    pub message: String,
    pub property: String,
    pub severity: ProblemSeverity,
}

impl From<&Diagnostic> for ValidationProblem {
    fn from(diagnostic: &Diagnostic) -> Self {
        let segments = &diagnostic.path;
        Self {
            error_code: diagnostic.code.clone(),
            node_path: node_path(segments),
            message: diagnostic.message.clone(),
            property: segments.last().map(ToString::to_string).unwrap_or_default(),
            severity: diagnostic.severity.into(),
        }
    }
}

/// `/`-joined path; the empty path is `/`. Segments are not escaped.
pub fn node_path(segments: &[PathSegment]) -> String {
    let joined = segments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(path: Vec<PathSegment>, severity: DiagnosticSeverity) -> Diagnostic {
        Diagnostic {
            code: "info-contact".to_string(),
            message: "Info object must have \"contact\" object.".to_string(),
            path,
            severity,
        }
    }

    #[test]
    fn severity_mapping_table() {
        let table = [
            (0, ProblemSeverity::High),
            (1, ProblemSeverity::Medium),
            (2, ProblemSeverity::Low),
            (3, ProblemSeverity::Ignore),
        ];
        for (code, expected) in table {
            let severity = DiagnosticSeverity::from_code(code).unwrap();
            assert_eq!(ProblemSeverity::from(severity), expected);
        }
    }

    #[test]
    fn node_path_of_empty_path_is_root() {
        assert_eq!(node_path(&[]), "/");
    }

    #[test]
    fn maps_diagnostic_fields() {
        let problem = ValidationProblem::from(&diagnostic(
            vec![
                PathSegment::from("paths"),
                PathSegment::from("/pets"),
                PathSegment::from("get"),
                PathSegment::from(0usize),
            ],
            DiagnosticSeverity::Warning,
        ));
        assert_eq!(problem.error_code, "info-contact");
        // Slashes inside segments are kept verbatim.
        assert_eq!(problem.node_path, "/paths//pets/get/0");
        assert_eq!(problem.property, "0");
        assert_eq!(problem.severity, ProblemSeverity::Medium);
    }

    #[test]
    fn empty_path_has_empty_property() {
        let problem = ValidationProblem::from(&diagnostic(vec![], DiagnosticSeverity::Error));
        assert_eq!(problem.node_path, "/");
        assert_eq!(problem.property, "");
        assert_eq!(problem.severity, ProblemSeverity::High);
    }

    #[test]
    fn serializes_with_wire_names() {
        let problem = ValidationProblem::from(&diagnostic(
            vec![PathSegment::from("info")],
            DiagnosticSeverity::Hint,
        ));
        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "errorCode": "info-contact",
                "nodePath": "/info",
                "message": "Info object must have \"contact\" object.",
                "property": "info",
                "severity": "ignore"
            })
        );
    }
}
