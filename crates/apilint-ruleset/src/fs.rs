//! Single-file virtual filesystem for ruleset loading.
//!
//! Resolved ruleset text never touches disk. The loader reads it through
//! [`RulesetFs`], and [`VirtualRulesetFs`] answers every path with the same
//! buffer, so a ruleset that extends a relative path only ever sees itself.

use std::io;

/// Fixed path the resolved ruleset is presented at.
pub const VIRTUAL_RULESET_PATH: &str = "/.spectral.json";

/// Read capability used by the loader for non-URL references.
pub trait RulesetFs: Send + Sync {
    fn read_file(&self, path: &str) -> io::Result<String>;
}

/// In-memory filesystem holding exactly one ruleset.
#[derive(Debug, Clone)]
pub struct VirtualRulesetFs {
    contents: String,
}

impl VirtualRulesetFs {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
        }
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }
}

impl RulesetFs for VirtualRulesetFs {
    fn read_file(&self, _path: &str) -> io::Result<String> {
        Ok(self.contents.clone())
    }
}

/// Normalise a relative reference into an absolute virtual path.
pub fn virtual_path(reference: &str) -> String {
    if reference.starts_with('/') {
        return reference.to_string();
    }
    format!("/{}", reference.trim_start_matches("./"))
}
