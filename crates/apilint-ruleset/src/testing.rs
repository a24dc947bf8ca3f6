//! In-memory fetcher for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Url;

use crate::error::FetchError;
use crate::fetch::{FetchedRuleset, RulesetFetcher};

/// Serves canned bodies by URL and records every call; unknown URLs are 404s.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    responses: HashMap<String, FetchedRuleset>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: &str, body: &str, content_type: Option<&str>) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedRuleset {
                body: body.to_string(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RulesetFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedRuleset, FetchError> {
        self.calls.lock().push(url.to_string());
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: url.to_string(),
            })
    }
}
