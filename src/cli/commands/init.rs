//! Init command
//!
//! Writes a configuration file with every option spelled out and a version
//! constraint for each action the workflows currently use.

use super::{CommandContext, Runnable};
use anyhow::{bail, Result};
use clap::Parser;
use github_ci::actions::ActionReference;
use github_ci::config::{ActionConfig, Config};
use github_ci::workflow::{self, Workflow, DEFAULT_WORKFLOWS_DIR};
use std::path::PathBuf;

/// Arguments for the init command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Workflow file or directory to collect actions from
    #[arg(default_value = DEFAULT_WORKFLOWS_DIR)]
    pub path: PathBuf,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let target = ctx.config_path.clone();
        if target.exists() && !self.force {
            bail!(
                "config file {} already exists (use --force to overwrite)",
                target.display()
            );
        }

        let workflows = match workflow::discover(&self.path) {
            Ok(workflows) => workflows,
            Err(e) => {
                ctx.output.warning(&format!("no workflows loaded: {e}"));
                Vec::new()
            }
        };

        let config = initial_config(&workflows);
        config.save(&target)?;

        ctx.output.success(&format!(
            "Wrote {} ({} action(s) configured)",
            target.display(),
            config.upgrade.actions.len()
        ));
        Ok(0)
    }
}

/// The full default configuration plus an entry for every remote action used.
fn initial_config(workflows: &[Workflow]) -> Config {
    let mut config = Config::full_default();
    for wf in workflows {
        let Ok(references) = wf.find_action_references() else {
            continue;
        };
        for found in references {
            if let Ok(action) = ActionReference::parse(&found.uses) {
                let name = action.name();
                if config.upgrade.actions.contains_key(&name) {
                    continue;
                }
                config.set_action_config(name, ActionConfig::default());
            }
        }
    }
    config
}

#[async_trait::async_trait]
impl Runnable for InitArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
