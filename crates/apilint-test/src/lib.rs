//! Test harness for the apilint validation service.
//!
//! Provides `TestServer`, which serves the full HTTP stack on an ephemeral
//! port, and `RulesetHost`, a mock server for remote rulesets.

#[cfg(test)]
mod scenarios;
pub mod server;

pub use server::{fixture, RulesetHost, TestError, TestServer};
