//! The lint and fix driver.
//!
//! [`WorkflowLinter`] owns the loaded workflows and the enabled linters and
//! runs every linter over every workflow. Any linter error stops the pass:
//! there is no partial result.
//!
//! ```text
//! new ──► (config loaded, linters built once) ──► lint ──► fix ──► lint
//!                                                   └──── classify ───┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use super::{classify_issues, Issue, Linter, LinterContext, LinterRegistry};
use crate::actions::{CacheStats, Resolver};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::workflow::Workflow;

/// Outcome of a fix-then-reverify run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    /// Issues from the first pass that are gone after fixing
    pub fixed: Vec<Issue>,
    /// Issues from the first pass that are still reported
    pub remaining: Vec<Issue>,
}

/// Runs the enabled linters over a set of workflows.
pub struct WorkflowLinter {
    workflows: Vec<Workflow>,
    resolver: Arc<dyn Resolver>,
    registry: LinterRegistry,
    config: Option<Arc<Config>>,
    config_path: Option<PathBuf>,
    linters: Option<Vec<(&'static str, Box<dyn Linter>)>>,
}

impl WorkflowLinter {
    /// Create a linter over `workflows`. The configuration is loaded from
    /// the default file on first use unless one is supplied.
    pub fn new(workflows: Vec<Workflow>, resolver: Arc<dyn Resolver>) -> Self {
        Self {
            workflows,
            resolver,
            registry: LinterRegistry::with_builtins(),
            config: None,
            config_path: None,
            linters: None,
        }
    }

    /// Use an already loaded configuration.
    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.config = Some(config);
        self.linters = None;
        self
    }

    /// Load the configuration lazily from `path` instead of the default file.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Replace the linter registry.
    pub fn with_registry(mut self, registry: LinterRegistry) -> Self {
        self.registry = registry;
        self.linters = None;
        self
    }

    pub fn workflows(&self) -> &[Workflow] {
        &self.workflows
    }

    /// Names of the enabled linters in run order.
    pub fn enabled_linters(&mut self) -> Result<Vec<&'static str>> {
        self.ensure_linters()?;
        Ok(self
            .linters
            .iter()
            .flatten()
            .map(|(name, _)| *name)
            .collect())
    }

    /// Hit and miss counters of the resolver cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats()
    }

    fn ensure_config(&mut self) -> Result<Arc<Config>> {
        if let Some(config) = &self.config {
            return Ok(Arc::clone(config));
        }
        let path = self
            .config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let config = Arc::new(Config::load(&path)?);
        self.config = Some(Arc::clone(&config));
        Ok(config)
    }

    fn ensure_linters(&mut self) -> Result<()> {
        if self.linters.is_some() {
            return Ok(());
        }
        let ctx = LinterContext {
            config: self.ensure_config()?,
            resolver: Arc::clone(&self.resolver),
        };
        let linters = self.registry.create_enabled(&ctx);
        debug!(
            "Enabled linters: {}",
            linters.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ")
        );
        self.linters = Some(linters);
        Ok(())
    }

    /// Run every enabled linter over every workflow.
    ///
    /// Issues are tagged with the name of the linter that reported them.
    pub async fn lint(&mut self) -> Result<Vec<Issue>> {
        self.ensure_linters()?;
        let linters = self.linters.as_deref().unwrap_or_default();

        let mut issues = Vec::new();
        for workflow in &self.workflows {
            for (name, linter) in linters {
                let found = linter
                    .lint_workflow(workflow)
                    .await
                    .map_err(|e| Error::linter_failed(*name, workflow.base_name(), e))?;
                issues.extend(found.into_iter().map(|issue| issue.with_linter(*name)));
            }
        }
        debug!("Lint found {} issues in {} workflows", issues.len(), self.workflows.len());
        Ok(issues)
    }

    /// Let every enabled linter fix every workflow. Changes are saved as
    /// they are made.
    pub async fn fix(&mut self) -> Result<()> {
        self.ensure_linters()?;
        let linters = self.linters.as_deref().unwrap_or_default();

        for workflow in &mut self.workflows {
            for (name, linter) in linters {
                linter
                    .fix_workflow(workflow)
                    .await
                    .map_err(|e| Error::fix_failed(*name, workflow.base_name(), e))?;
            }
        }
        Ok(())
    }

    /// Lint, fix, lint again and split the first pass into fixed and
    /// remaining issues.
    pub async fn lint_and_fix(&mut self) -> Result<FixReport> {
        let before = self.lint().await?;
        self.fix().await?;
        let after = self.lint().await?;
        let (fixed, remaining) = classify_issues(&before, &after);
        info!("Fixed {} of {} issues", fixed.len(), before.len());
        Ok(FixReport { fixed, remaining })
    }
}
