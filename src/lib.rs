//! # github-ci - GitHub Actions workflow linter and upgrader
//!
//! github-ci reads the workflow files of a repository, runs a configurable set
//! of checks over them, fixes what can be fixed mechanically, and keeps action
//! references pinned and up to date against the GitHub API.
//!
//! ## Core Concepts
//!
//! - **Workflows**: a workflow file kept as raw text (the only thing ever
//!   written back), a typed summary, and a lazily built positioned tree
//! - **Action references**: `owner/repo[/path]@ref` values of `uses:` keys
//! - **Resolver**: looks up tags and commit hashes, with a shared cache
//! - **Linters**: independent checks that report [`Issue`](linter::Issue)s and
//!   may fix them
//! - **Orchestrator**: runs the enabled linters and drives lint, fix, re-lint
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CLI (lint, upgrade, init)                │
//! └──────────────────────────────────────────────────────────────┘
//!                 │                               │
//!                 ▼                               ▼
//! ┌───────────────────────────────┐   ┌──────────────────────────┐
//! │  WorkflowLinter orchestrator  │   │         Upgrader         │
//! │  versions  permissions format │   │                          │
//! │  secrets   injection   style  │   │                          │
//! └───────────────────────────────┘   └──────────────────────────┘
//!                 │                               │
//!                 └───────────────┬───────────────┘
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │        Resolver (GitHubClient + shared VersionCache)          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use github_ci::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let workflows = load_workflows(".github/workflows")?;
//!     let config = Arc::new(Config::load(".github-ci.yaml")?);
//!     let resolver: Arc<dyn Resolver> = Arc::new(GitHubClient::new());
//!
//!     let mut linter = WorkflowLinter::new(workflows, resolver).with_config(config);
//!     for issue in linter.lint().await? {
//!         println!("{issue}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::actions::{
        ActionReference, CacheStats, GitHubClient, ResolveError, ResolvedVersion, Resolver,
        VersionCache,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::linter::{
        classify_issues, FixReport, Issue, Linter, LinterRegistry, WorkflowLinter,
    };
    pub use crate::upgrade::{Upgrade, Upgrader};
    pub use crate::workflow::{discover, load_workflows, Workflow};
}

pub mod actions;

pub mod config;

pub mod error;

pub mod fsutil;

pub mod linter;

pub mod textutil;

pub mod upgrade;

pub mod version;

pub mod workflow;
