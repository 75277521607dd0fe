//! Upgrade command
//!
//! This module implements the `upgrade` subcommand: move every action to
//! the newest version its configured constraint allows.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use github_ci::upgrade::{Upgrade, Upgrader};
use github_ci::workflow::{self, DEFAULT_WORKFLOWS_DIR};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the upgrade command
#[derive(Parser, Debug, Clone)]
pub struct UpgradeArgs {
    /// Workflow file or directory of workflows
    #[arg(default_value = DEFAULT_WORKFLOWS_DIR)]
    pub path: PathBuf,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
struct UpgradeReport<'a> {
    dry_run: bool,
    upgrades: &'a [Upgrade],
}

impl UpgradeArgs {
    /// Execute the upgrade command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let mut workflows = workflow::discover(&self.path).context("failed to load workflows")?;
        ctx.output.info(&format!(
            "Checking {} workflow(s) for upgrades (format: {})",
            workflows.len(),
            ctx.config.version_format()
        ));

        let upgrader = Upgrader::new(ctx.resolver(), Arc::clone(&ctx.config));
        let upgrades = upgrader
            .run(&mut workflows, self.dry_run)
            .await
            .context("failed to upgrade actions")?;

        if ctx.output.is_json() {
            ctx.output.json(&UpgradeReport {
                dry_run: self.dry_run,
                upgrades: &upgrades,
            })?;
            return Ok(0);
        }

        if upgrades.is_empty() {
            ctx.output.success("All actions are up to date.");
            return Ok(0);
        }

        for upgrade in &upgrades {
            ctx.output.plan(&upgrade.to_string());
        }
        ctx.output.plan("");
        if self.dry_run {
            ctx.output.summary(
                &format!("{} upgrade(s) available (dry run, nothing written).", upgrades.len()),
                true,
            );
        } else {
            ctx.output.summary(&format!("{} action(s) upgraded.", upgrades.len()), true);
        }
        ctx.output.flush();
        Ok(0)
    }
}

#[async_trait::async_trait]
impl Runnable for UpgradeArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
