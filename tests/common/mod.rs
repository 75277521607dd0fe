//! Shared test utilities for the github-ci test suite.
//!
//! This module provides:
//! - A table-driven [`Resolver`] that never touches the network
//! - Temporary workflow directory helpers
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use github_ci::actions::{CacheStats, ResolveError, ResolveResult, ResolvedVersion, Resolver};
use github_ci::workflow::Workflow;

pub const CHECKOUT_V3_HASH: &str = "b4ffde65f46336ab88eb53be808477a3936bae11";
pub const CHECKOUT_V4_HASH: &str = "11bd71901bbe5b1630ceea73d27597364c9af683";

// ============================================================================
// Static Resolver
// ============================================================================

/// Resolver answering from fixed tables, keyed by `owner/repo`.
#[derive(Default)]
pub struct StaticResolver {
    /// `owner/repo@ref` -> hash
    commits: HashMap<String, String>,
    /// `owner/repo@vN` -> newest release in that major
    majors: HashMap<String, ResolvedVersion>,
    /// `owner/repo` -> newest release overall
    latest: HashMap<String, ResolvedVersion>,
    lookups: AtomicU64,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `actions/checkout` with v3 at v3.5.0 and v4 at v4.2.2.
    pub fn checkout() -> Self {
        Self::new()
            .with_release("actions/checkout", "v3", "v3.5.0", CHECKOUT_V3_HASH)
            .with_release("actions/checkout", "v4", "v4.2.2", CHECKOUT_V4_HASH)
    }

    /// Register `tag` as the newest release of its major series, and the
    /// newest release overall if it beats the one already known.
    pub fn with_release(mut self, action: &str, major: &str, tag: &str, hash: &str) -> Self {
        self.commits.insert(format!("{action}@{tag}"), hash.to_string());
        self.majors
            .insert(format!("{action}@{major}"), ResolvedVersion::new(tag, hash));
        let newer = self
            .latest
            .get(action)
            .map_or(true, |known| github_ci::version::compare(tag, &known.tag).is_gt());
        if newer {
            self.latest
                .insert(action.to_string(), ResolvedVersion::new(tag, hash));
        }
        self
    }

    /// Number of resolver calls that were answered.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
    }

    fn not_found(owner: &str, repo: &str, reference: &str) -> ResolveError {
        ResolveError::RefNotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
        }
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve_commit_hash(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> ResolveResult<String> {
        if github_ci::actions::is_commit_hash(reference) {
            return Ok(reference.to_string());
        }
        self.count();
        self.commits
            .get(&format!("{owner}/{repo}@{reference}"))
            .cloned()
            .ok_or_else(|| Self::not_found(owner, repo, reference))
    }

    async fn resolve_latest_constrained(
        &self,
        owner: &str,
        repo: &str,
        _current_ref: &str,
        pattern: &str,
    ) -> ResolveResult<ResolvedVersion> {
        self.count();
        let prefix = format!("{owner}/{repo}@");
        self.majors
            .iter()
            .filter(|(key, resolved)| {
                key.starts_with(&prefix)
                    && github_ci::version::matches_pattern(&resolved.tag, pattern)
            })
            .map(|(_, resolved)| resolved.clone())
            .max_by(|a, b| github_ci::version::compare(&a.tag, &b.tag))
            .ok_or_else(|| ResolveError::NoMatchingTags {
                owner: owner.to_string(),
                repo: repo.to_string(),
                pattern: pattern.to_string(),
            })
    }

    async fn resolve_latest_unconstrained(
        &self,
        owner: &str,
        repo: &str,
    ) -> ResolveResult<ResolvedVersion> {
        self.count();
        self.latest
            .get(&format!("{owner}/{repo}"))
            .cloned()
            .ok_or_else(|| ResolveError::NoTags {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
    }

    async fn resolve_tag_for_commit(
        &self,
        owner: &str,
        repo: &str,
        hash: &str,
    ) -> ResolveResult<Option<String>> {
        self.count();
        let prefix = format!("{owner}/{repo}@");
        Ok(self
            .commits
            .iter()
            .find(|(key, sha)| key.starts_with(&prefix) && sha.eq_ignore_ascii_case(hash))
            .and_then(|(key, _)| key.strip_prefix(&prefix).map(str::to_string)))
    }

    async fn resolve_latest_minor_in_major(
        &self,
        owner: &str,
        repo: &str,
        major: &str,
    ) -> ResolveResult<ResolvedVersion> {
        self.count();
        let major = github_ci::version::normalize(major);
        self.majors
            .get(&format!("{owner}/{repo}@v{major}"))
            .cloned()
            .ok_or_else(|| ResolveError::NoMajorTags {
                owner: owner.to_string(),
                repo: repo.to_string(),
                major: major.to_string(),
            })
    }

    fn cache_stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

// ============================================================================
// Workflow Fixtures
// ============================================================================

/// A temporary repository with a `.github/workflows` directory.
pub struct TestRepo {
    pub dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.dir.path().join(".github/workflows")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join(".github-ci.yaml")
    }

    /// Write a workflow file and return its path.
    pub fn add_workflow(&self, name: &str, content: &str) -> PathBuf {
        let path = self.workflows_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.config_path();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, path: impl AsRef<Path>) -> String {
        fs::read_to_string(path).unwrap()
    }

    /// Load one workflow from disk.
    pub fn load(&self, name: &str) -> Workflow {
        Workflow::load(self.workflows_dir().join(name)).unwrap()
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// A tidy workflow none of the linters complain about.
pub const CLEAN_WORKFLOW: &str = "\
name: Continuous integration
on: push
permissions:
  contents: read
jobs:
  build:
    name: Build and test
    runs-on: ubuntu-latest
    steps:
      - name: Checkout code
        uses: actions/checkout@b4ffde65f46336ab88eb53be808477a3936bae11 # v3.5.0
      - name: Run tests
        run: cargo test
";
