//! # Remote Identifier Index
//!
//! Bulk-resolves repository short names to canonical `owner/name`
//! identifiers. The index is built once from a capped provider listing and
//! is read-only for the rest of the run, with one exception: a cache miss
//! during the single-threaded planning phase may trigger a one-off
//! existence probe under the authenticated owner (`resolve`), which fills
//! the cache on success. Workers never call `resolve`; they only see the
//! index behind a shared reference.
//!
//! Short-name collisions in the bulk listing are resolved last-entry-wins,
//! with a warning naming both canonical identifiers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::warn;

use crate::error::Result;
use crate::provider::Provider;

/// Trailing short-name component of a canonical `owner/name` identifier.
pub fn short_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

/// Short name → canonical identifier cache backed by a provider.
pub struct RemoteIndex {
    provider: Arc<dyn Provider>,
    owner: String,
    by_short: HashMap<String, String>,
    ids: HashSet<String>,
}

impl RemoteIndex {
    /// Build the index from the provider's bulk listing, capped at `cap`
    /// entries, keyed by trailing short name.
    pub fn bulk_resolve(provider: Arc<dyn Provider>, cap: usize) -> Result<Self> {
        let owner = provider.viewer_login()?;
        let listed = provider.list_repo_ids(cap)?;

        let mut index = Self {
            provider,
            owner,
            by_short: HashMap::new(),
            ids: HashSet::new(),
        };
        for id in listed {
            index.insert(id);
        }
        Ok(index)
    }

    /// Build an index from known entries, without touching the provider's
    /// listing. Used by tests and deterministic setups.
    pub fn with_entries<I>(provider: Arc<dyn Provider>, owner: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut index = Self {
            provider,
            owner: owner.to_string(),
            by_short: HashMap::new(),
            ids: HashSet::new(),
        };
        for id in ids {
            index.insert(id);
        }
        index
    }

    fn insert(&mut self, id: String) {
        let short = short_name(&id).to_string();
        self.ids.insert(id.clone());
        if let Some(prev) = self.by_short.insert(short.clone(), id.clone()) {
            if prev != id {
                warn!(
                    "short name '{}' is ambiguous: {} overwrites {}",
                    short, id, prev
                );
            }
        }
    }

    /// The authenticated identity assumed as owner for fallback probes.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Cache-only lookup, safe from any thread.
    pub fn lookup(&self, short: &str) -> Option<&str> {
        self.by_short.get(short).map(String::as_str)
    }

    /// Whether a canonical identifier is known to the index.
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Resolve a short name: cache hit first, otherwise a single existence
    /// probe against `<owner>/<short>`, cached on success.
    ///
    /// Must only be called from the single-threaded planning phase.
    pub fn resolve(&mut self, short: &str) -> Option<String> {
        if let Some(id) = self.by_short.get(short) {
            return Some(id.clone());
        }

        let candidate = format!("{}/{}", self.owner, short);
        match self.provider.repo_info(&candidate) {
            Ok(Some(info)) => {
                let id = info.name_with_owner;
                self.insert(id.clone());
                Some(id)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("existence probe for {} failed: {}", candidate, e);
                None
            }
        }
    }

    /// Number of cached canonical identifiers.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
