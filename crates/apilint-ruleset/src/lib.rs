//! Ruleset resolution and loading for apilint.
//!
//! A ruleset reference is either an `http`/`https` URL or literal ruleset
//! text. [`RulesetResolver`] turns the reference into content, fetching remote
//! rulesets through an injected [`RulesetFetcher`] and optionally caching
//! them. [`RulesetLoader`] presents that content through a single-file
//! [`VirtualRulesetFs`], bundles `extends` chains, and compiles the result
//! into an executable [`apilint_engine::Ruleset`].

pub mod cache;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod loader;
pub mod source;

#[cfg(test)]
mod testing;

pub use cache::RulesetCache;
pub use error::{FetchError, RulesetError};
pub use fetch::{FetchConfig, FetchedRuleset, HttpRulesetFetcher, RulesetFetcher};
pub use fs::{RulesetFs, VirtualRulesetFs, VIRTUAL_RULESET_PATH};
pub use loader::{RulesetLoader, MAX_EXTENDS_DEPTH};
pub use source::{remote_url, RulesetResolver, RulesetSource};

pub use reqwest::Url;
