//! Action upgrades.
//!
//! The [`Upgrader`] looks up the newest version of every action a workflow
//! uses, within the constraint configured for that action, and rewrites
//! references that are behind. Planning only reads; applying goes through
//! the same textual replacement the version linter uses, so everything
//! except the reference itself is left alone.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actions::{ActionReference, ResolveError, ResolvedVersion, Resolver};
use crate::config::{normalize_action_name, should_update, Config, VersionFormat};
use crate::error::{Error, Result};
use crate::version;
use crate::workflow::Workflow;

/// One planned reference change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upgrade {
    /// Workflow file name
    pub file: String,
    /// Line of the first occurrence
    pub line: usize,
    /// Current `uses` value
    pub uses: String,
    /// Replacement `uses` value
    pub new_uses: String,
    /// Version currently referenced
    pub from: String,
    /// Version being upgraded to
    pub to: String,
    /// Trailing comment written next to the new reference
    pub comment: Option<String>,
}

impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} {} -> {}",
            self.file,
            self.line,
            normalize_action_name(&self.uses),
            self.from,
            self.to
        )
    }
}

/// Plans and applies action upgrades.
pub struct Upgrader {
    resolver: Arc<dyn Resolver>,
    config: Arc<Config>,
}

impl Upgrader {
    pub fn new(resolver: Arc<dyn Resolver>, config: Arc<Config>) -> Self {
        Self { resolver, config }
    }

    /// Version the reference currently points at. A commit hash is mapped
    /// back to its tag; `None` when that is not possible.
    async fn current_version(&self, action: &ActionReference) -> Result<Option<String>> {
        if !action.is_pinned() {
            return Ok(Some(action.reference.clone()));
        }
        let tag = self
            .resolver
            .resolve_tag_for_commit(&action.owner, &action.repo, &action.reference)
            .await?;
        if tag.is_none() {
            warn!("No tag points at {}, skipping", action);
        }
        Ok(tag)
    }

    async fn latest(
        &self,
        action: &ActionReference,
        current: &str,
        pattern: &str,
    ) -> Result<Option<ResolvedVersion>> {
        let result = if pattern.trim().is_empty() {
            self.resolver
                .resolve_latest_unconstrained(&action.owner, &action.repo)
                .await
        } else {
            self.resolver
                .resolve_latest_constrained(&action.owner, &action.repo, current, pattern)
                .await
        };

        match result {
            Ok(resolved) => Ok(Some(resolved)),
            Err(
                e @ (ResolveError::NoMatchingTags { .. }
                | ResolveError::NoTags { .. }
                | ResolveError::NoMajorTags { .. }
                | ResolveError::RefNotFound { .. }),
            ) => {
                warn!("Skipping {}: {}", action, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reference and comment to write for a resolved version.
    fn render(&self, resolved: &ResolvedVersion) -> (String, Option<String>) {
        match self.config.version_format() {
            VersionFormat::Tag => (resolved.tag.clone(), None),
            VersionFormat::Hash => (resolved.hash.clone(), Some(resolved.tag.clone())),
            VersionFormat::Major => {
                let prefix = if version::normalize(&resolved.tag) == resolved.tag.trim() {
                    ""
                } else {
                    "v"
                };
                (format!("{}{}", prefix, version::major(&resolved.tag)), None)
            }
        }
    }

    /// Upgrades available for one workflow. Nothing is written.
    pub async fn plan(&self, workflow: &Workflow) -> Result<Vec<Upgrade>> {
        let file = workflow.base_name();
        let mut seen = HashSet::new();
        let mut upgrades = Vec::new();

        for found in workflow.find_action_references()? {
            if !seen.insert(found.uses.clone()) {
                continue;
            }
            let Ok(action) = ActionReference::parse(&found.uses) else {
                continue;
            };
            let Some(current) = self.current_version(&action).await? else {
                continue;
            };

            let pattern = self.config.action_config(&action.name()).version;
            let Some(latest) = self.latest(&action, &current, &pattern).await? else {
                continue;
            };
            if !should_update(&current, &latest.tag, &pattern) {
                debug!("{} is up to date ({})", action.name(), current);
                continue;
            }

            let (reference, comment) = self.render(&latest);
            let new_uses = action.with_ref(&reference);
            if new_uses == found.uses {
                continue;
            }
            upgrades.push(Upgrade {
                file: file.clone(),
                line: found.line,
                uses: found.uses,
                new_uses,
                from: current,
                to: latest.tag,
                comment,
            });
        }
        Ok(upgrades)
    }

    /// Write planned upgrades into the workflow and save it.
    pub fn apply(&self, workflow: &mut Workflow, upgrades: &[Upgrade]) -> Result<()> {
        for upgrade in upgrades {
            workflow
                .update_reference(&upgrade.uses, &upgrade.new_uses, upgrade.comment.as_deref())
                .map_err(|e| Error::UpdateFailed {
                    file: workflow.path().to_path_buf(),
                    source: Box::new(e),
                })?;
            info!("Upgraded {}", upgrade);
        }
        Ok(())
    }

    /// Plan every workflow and, unless `dry_run`, apply the plan.
    pub async fn run(&self, workflows: &mut [Workflow], dry_run: bool) -> Result<Vec<Upgrade>> {
        let mut all = Vec::new();
        for workflow in workflows.iter_mut() {
            let upgrades = self.plan(workflow).await?;
            if !dry_run {
                self.apply(workflow, &upgrades)?;
            }
            all.extend(upgrades);
        }
        Ok(all)
    }
}
