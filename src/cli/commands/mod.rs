//! Subcommands module for github-ci CLI
//!
//! This module contains all the subcommand implementations.

pub mod init;
pub mod lint;
pub mod upgrade;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use github_ci::actions::{GitHubClient, GitHubClientConfig, Resolver, VersionCache};
use github_ci::config::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Arc<Config>,
    /// Where the configuration was read from
    pub config_path: PathBuf,
    /// Output formatter
    pub output: OutputFormatter,
    /// Verbosity level
    pub verbosity: u8,
    /// Cancelled when the run timeout elapses
    pub cancel: CancellationToken,
    /// Version cache shared by every resolver of this invocation
    pub cache: Arc<VersionCache>,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let output = OutputFormatter::new(!cli.no_color, cli.is_json(), cli.verbosity());

        Self {
            config: Arc::new(config),
            config_path: cli.config.clone(),
            output,
            verbosity: cli.verbosity(),
            cancel: CancellationToken::new(),
            cache: Arc::new(VersionCache::new()),
        }
    }

    /// Cancel all remote lookups once `timeout` has elapsed.
    pub fn start_deadline(&self, timeout: Duration) {
        let token = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    warn!("Run timeout of {:?} reached, cancelling remote lookups", timeout);
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });
    }

    /// A GitHub-backed resolver sharing this invocation's cache and deadline.
    pub fn resolver(&self) -> Arc<dyn Resolver> {
        let client = GitHubClient::builder()
            .config(GitHubClientConfig::from_env())
            .cache(Arc::clone(&self.cache))
            .cancellation(self.cancel.clone())
            .build();
        Arc::new(client)
    }
}

impl Drop for CommandContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Trait for runnable commands
#[async_trait::async_trait]
pub trait Runnable {
    /// Execute the command
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32>;
}
