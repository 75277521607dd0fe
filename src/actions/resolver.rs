//! The resolver capability used by linters and the upgrader.

use async_trait::async_trait;

use super::cache::{CacheStats, VersionResult};
use super::error::ResolveResult;

/// Resolves symbolic action refs against a hosting API.
///
/// Implemented by [`GitHubClient`](super::GitHubClient); tests substitute
/// doubles (`MockResolver` in unit tests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a tag, branch or bare major version to a commit hash.
    ///
    /// A ref that already is a commit hash is returned unchanged without any
    /// network call.
    async fn resolve_commit_hash(&self, owner: &str, repo: &str, reference: &str)
        -> ResolveResult<String>;

    /// Latest tag matching `pattern`, cached per (owner, repo, current ref, pattern).
    async fn resolve_latest_constrained(
        &self,
        owner: &str,
        repo: &str,
        current_ref: &str,
        pattern: &str,
    ) -> VersionResult;

    /// Absolute latest version: the latest release, else the greatest tag.
    async fn resolve_latest_unconstrained(&self, owner: &str, repo: &str) -> VersionResult;

    /// Tag pointing at `hash`, if any.
    async fn resolve_tag_for_commit(
        &self,
        owner: &str,
        repo: &str,
        hash: &str,
    ) -> ResolveResult<Option<String>>;

    /// Greatest tag inside a major series (`v3` -> `v3.6.0`).
    async fn resolve_latest_minor_in_major(
        &self,
        owner: &str,
        repo: &str,
        major: &str,
    ) -> VersionResult;

    /// Hit/miss counters of the backing cache.
    fn cache_stats(&self) -> CacheStats;
}
