//! Ruleset loading and `extends` bundling.
//!
//! The resolved ruleset is read through a [`VirtualRulesetFs`] at
//! [`VIRTUAL_RULESET_PATH`]. Each `extends` reference is loaded recursively:
//! absolute HTTP(S) URLs are fetched, relative references are joined onto the
//! parent's URL when it has one and read from the virtual filesystem
//! otherwise. Inherited rules are merged in `extends` order before the
//! ruleset's own entries are applied.

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::Url;

use apilint_engine::{BundledRuleset, Ruleset, RulesetDefinition};

use crate::error::RulesetError;
use crate::fs::{virtual_path, RulesetFs, VirtualRulesetFs, VIRTUAL_RULESET_PATH};
use crate::source::{remote_url, RulesetResolver, RulesetSource};

/// Maximum nesting of `extends`.
pub const MAX_EXTENDS_DEPTH: usize = 16;

/// Where a ruleset in the extends tree was read from.
struct Location {
    /// Identity used for cycle detection: a URL or a virtual path.
    key: String,
    /// Base for relative references, when the ruleset came from a URL.
    base: Option<Url>,
}

/// Loads rulesets into executable form.
#[derive(Clone)]
pub struct RulesetLoader {
    resolver: RulesetResolver,
}

impl RulesetLoader {
    pub fn new(resolver: RulesetResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RulesetResolver {
        &self.resolver
    }

    /// Resolve a reference and load the ruleset it designates.
    pub async fn load(&self, reference: &str) -> Result<Ruleset, RulesetError> {
        let bundle = self.load_bundle(reference).await?;
        Ok(bundle.compile()?)
    }

    /// Resolve a reference and bundle its `extends` tree without compiling.
    ///
    /// Compilation is CPU-bound; async callers run [`BundledRuleset::compile`]
    /// on a blocking thread.
    pub async fn load_bundle(&self, reference: &str) -> Result<BundledRuleset, RulesetError> {
        let source = self.resolver.resolve(reference).await?;
        self.bundle_source(&source).await
    }

    /// Bundle already resolved content.
    pub async fn bundle_source(
        &self,
        source: &RulesetSource,
    ) -> Result<BundledRuleset, RulesetError> {
        let fs = VirtualRulesetFs::new(source.to_json_text());
        let root = Location {
            key: source
                .url()
                .map(Url::to_string)
                .unwrap_or_else(|| VIRTUAL_RULESET_PATH.to_string()),
            base: source.url().cloned(),
        };
        let text = fs
            .read_file(VIRTUAL_RULESET_PATH)
            .map_err(|e| RulesetError::Extends {
                reference: VIRTUAL_RULESET_PATH.to_string(),
                reason: e.to_string(),
            })?;

        let bundle = self.bundle(&fs, root, text, Vec::new()).await?;
        tracing::debug!(rules = bundle.rules().len(), "ruleset bundled");
        Ok(bundle)
    }

    fn bundle<'a>(
        &'a self,
        fs: &'a dyn RulesetFs,
        location: Location,
        text: String,
        mut chain: Vec<String>,
    ) -> BoxFuture<'a, Result<BundledRuleset, RulesetError>> {
        async move {
            if chain.contains(&location.key) {
                chain.push(location.key);
                return Err(RulesetError::Cycle {
                    chain: chain.join(" -> "),
                });
            }
            if chain.len() >= MAX_EXTENDS_DEPTH {
                return Err(RulesetError::TooDeep {
                    max: MAX_EXTENDS_DEPTH,
                });
            }
            chain.push(location.key.clone());

            let mut definition = RulesetDefinition::parse(&text)?;
            let mut bundle = BundledRuleset::new();
            for entry in std::mem::take(&mut definition.extends) {
                let (parent_location, parent_text) = self
                    .read_extends(fs, &entry.reference, location.base.as_ref())
                    .await?;
                let parent = self
                    .bundle(fs, parent_location, parent_text, chain.clone())
                    .await?;
                bundle.extend(parent, entry.mode);
            }
            bundle.apply(definition)?;

            tracing::debug!(
                location = %location.key,
                rules = bundle.rules().len(),
                "ruleset bundled"
            );
            Ok(bundle)
        }
        .boxed()
    }

    async fn read_extends(
        &self,
        fs: &dyn RulesetFs,
        reference: &str,
        base: Option<&Url>,
    ) -> Result<(Location, String), RulesetError> {
        let failed = |reason: String| RulesetError::Extends {
            reference: reference.to_string(),
            reason,
        };

        if reference.starts_with("spectral:") {
            return Err(RulesetError::Unsupported {
                reference: reference.to_string(),
            });
        }

        let url = match (remote_url(reference), base) {
            (Some(url), _) => Some(url),
            (None, Some(base)) => {
                let joined = base.join(reference).map_err(|e| failed(e.to_string()))?;
                if !matches!(joined.scheme(), "http" | "https") {
                    return Err(failed(format!("unsupported scheme '{}'", joined.scheme())));
                }
                Some(joined)
            }
            (None, None) => None,
        };

        match url {
            Some(url) => {
                let source = self
                    .resolver
                    .fetch(&url)
                    .await
                    .map_err(|e| failed(e.to_string()))?;
                let location = Location {
                    key: url.to_string(),
                    base: Some(url),
                };
                Ok((location, source.to_json_text()))
            }
            None => {
                let path = virtual_path(reference);
                let text = fs.read_file(&path).map_err(|e| failed(e.to_string()))?;
                let location = Location {
                    key: path,
                    base: None,
                };
                Ok((location, text))
            }
        }
    }
}
