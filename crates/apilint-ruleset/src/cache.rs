//! In-memory TTL cache of fetched rulesets, keyed by URL.
//!
//! Only successful fetches are stored. Expired entries are dropped on lookup
//! and swept periodically on insert.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::fetch::FetchedRuleset;

struct CacheEntry {
    ruleset: FetchedRuleset,
    expires_at: Instant,
}

/// Thread-safe ruleset cache.
#[derive(Clone)]
pub struct RulesetCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    cleanup_interval: Duration,
    last_cleanup: Arc<RwLock<Instant>>,
}

impl RulesetCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            cleanup_interval: Duration::from_secs(60),
            last_cleanup: Arc::new(RwLock::new(Instant::now())),
        }
    }

    /// Build a cache from a TTL in seconds; `0` disables caching.
    pub fn from_ttl_secs(secs: u64) -> Option<Self> {
        (secs > 0).then(|| Self::new(Duration::from_secs(secs)))
    }

    /// Look up a live entry.
    pub fn get(&self, url: &str) -> Option<FetchedRuleset> {
        let entries = self.entries.read();
        entries
            .get(url)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.ruleset.clone())
    }

    /// Store a fetched ruleset.
    pub fn insert(&self, url: &str, ruleset: FetchedRuleset) {
        self.maybe_cleanup();
        let entry = CacheEntry {
            ruleset,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(url.to_string(), entry);
    }

    /// Number of stored entries, live or not yet swept.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn maybe_cleanup(&self) {
        let now = Instant::now();
        {
            let last = self.last_cleanup.read();
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
        }
        *self.last_cleanup.write() = now;
        self.entries.write().retain(|_, entry| entry.expires_at > now);
    }
}
