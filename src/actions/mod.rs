//! GitHub Action references and their resolution.
//!
//! A workflow step refers to an action as `owner/repo[/path]@ref`. This module
//! parses those references and resolves symbolic refs (tags, branches, bare
//! major versions) to commit hashes through the [`Resolver`] trait, backed in
//! production by [`GitHubClient`] and a shared [`VersionCache`].

pub mod cache;
pub mod client;
pub mod error;
pub mod resolver;

pub use cache::{CacheStats, ResolvedVersion, VersionCache, VersionKey, VersionResult};
pub use client::{GitHubClient, GitHubClientBuilder, GitHubClientConfig};
pub use error::{ResolveError, ResolveResult};
pub use resolver::Resolver;
#[cfg(test)]
pub use resolver::MockResolver;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::version;

/// Length of a full git SHA-1 commit hash.
pub const COMMIT_HASH_LEN: usize = 40;

/// A parsed `uses:` value pointing at a remote action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionReference {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Subdirectory for actions that live inside a repository
    pub path: Option<String>,
    /// Tag, branch, bare major version or commit hash
    pub reference: String,
}

impl ActionReference {
    /// Parse `owner/repo[/path]@ref`.
    ///
    /// Local (`./path`) and docker (`docker://image`) references are rejected
    /// since they cannot be resolved against a repository.
    pub fn parse(uses: &str) -> Result<Self> {
        let uses = uses.trim();
        let (action, reference) = uses
            .rsplit_once('@')
            .ok_or_else(|| Error::InvalidActionFormat(uses.to_string()))?;
        if reference.is_empty() {
            return Err(Error::InvalidActionFormat(uses.to_string()));
        }

        let (owner, rest) = action
            .split_once('/')
            .ok_or_else(|| Error::InvalidActionPath(uses.to_string()))?;
        let (repo, path) = match rest.split_once('/') {
            Some((repo, path)) => (repo, (!path.is_empty()).then(|| path.to_string())),
            None => (rest, None),
        };

        if owner.is_empty() || owner == "." || owner.ends_with(':') || repo.is_empty() {
            return Err(Error::InvalidActionPath(uses.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path,
            reference: reference.to_string(),
        })
    }

    /// The action name without the ref: `owner/repo[/path]`.
    pub fn name(&self) -> String {
        match &self.path {
            Some(path) => format!("{}/{}/{}", self.owner, self.repo, path),
            None => format!("{}/{}", self.owner, self.repo),
        }
    }

    /// Render the same action pointing at another ref.
    pub fn with_ref(&self, reference: &str) -> String {
        format!("{}@{}", self.name(), reference)
    }

    /// Returns true if the ref is already an immutable commit hash.
    pub fn is_pinned(&self) -> bool {
        is_commit_hash(&self.reference)
    }
}

impl FromStr for ActionReference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ActionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name(), self.reference)
    }
}

/// Returns true for a 40 character hexadecimal string.
pub fn is_commit_hash(s: &str) -> bool {
    s.len() == COMMIT_HASH_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Returns true for refs such as `v4`, `V2` or `3` that only name a major version.
pub fn is_major_version_only(s: &str) -> bool {
    let normalized = version::normalize(s);
    !normalized.is_empty() && normalized.chars().all(|c| c.is_ascii_digit())
}
