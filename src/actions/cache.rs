//! Version lookup cache.
//!
//! Results are kept in two separate spaces: *constrained* lookups (latest tag
//! under a pattern, as seen from a current ref) and *unconstrained* lookups
//! (absolute latest). A result from one space is never returned for a query
//! in the other. Failures are cached too, so a missing repository is only
//! asked about once per run.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::error::ResolveResult;

/// A resolved tag together with the commit it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Tag name, e.g. `v4.1.7`
    pub tag: String,
    /// Full commit hash
    pub hash: String,
}

impl ResolvedVersion {
    /// Create a resolved version.
    pub fn new(tag: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            hash: hash.into(),
        }
    }
}

/// Cached outcome of a lookup: a version or the error it produced.
pub type VersionResult = ResolveResult<ResolvedVersion>;

/// Identity of a cached lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionKey {
    pub owner: String,
    pub repo: String,
    pub reference: String,
    pub pattern: String,
}

impl VersionKey {
    /// Key for a pattern-limited lookup from a current ref.
    pub fn constrained(owner: &str, repo: &str, reference: &str, pattern: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Key for the absolute latest version of a repository.
    pub fn unconstrained(owner: &str, repo: &str) -> Self {
        Self::constrained(owner, repo, "", "")
    }

    /// Returns true if the key carries a ref or a pattern.
    pub fn is_constrained(&self) -> bool {
        !self.reference.is_empty() || !self.pattern.is_empty()
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_constrained() {
            write!(f, "{}/{}:{}:{}", self.owner, self.repo, self.reference, self.pattern)
        } else {
            write!(f, "{}/{}", self.owner, self.repo)
        }
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that went to the network
    pub misses: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    constrained: HashMap<VersionKey, VersionResult>,
    unconstrained: HashMap<VersionKey, VersionResult>,
    stats: CacheStats,
}

/// Thread-safe version cache, meant to be shared through an `Arc`.
///
/// Every `set_*` counts as a miss (it only happens after a real lookup) and
/// every successful `get_*` counts as a hit. Counters are updated under the
/// same lock as the maps.
#[derive(Debug, Default)]
pub struct VersionCache {
    state: Mutex<CacheState>,
}

impl VersionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a constrained result.
    pub fn get_constrained(&self, key: &VersionKey) -> Option<VersionResult> {
        let mut state = self.state.lock();
        let found = state.constrained.get(key).cloned();
        if found.is_some() {
            state.stats.hits += 1;
            debug!("version cache hit: {}", key);
        }
        found
    }

    /// Store a constrained result.
    pub fn set_constrained(&self, key: VersionKey, result: VersionResult) {
        let mut state = self.state.lock();
        state.stats.misses += 1;
        debug!("version cache store: {}", key);
        state.constrained.insert(key, result);
    }

    /// Look up an unconstrained result.
    pub fn get_unconstrained(&self, key: &VersionKey) -> Option<VersionResult> {
        let mut state = self.state.lock();
        let found = state.unconstrained.get(key).cloned();
        if found.is_some() {
            state.stats.hits += 1;
            debug!("version cache hit: {} (latest)", key);
        }
        found
    }

    /// Store an unconstrained result.
    pub fn set_unconstrained(&self, key: VersionKey, result: VersionResult) {
        let mut state = self.state.lock();
        state.stats.misses += 1;
        debug!("version cache store: {} (latest)", key);
        state.unconstrained.insert(key, result);
    }

    /// Number of cached entries across both spaces.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.constrained.len() + state.unconstrained.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.constrained.clear();
        state.unconstrained.clear();
        state.stats = CacheStats::default();
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}
