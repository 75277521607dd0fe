//! Action version pinning.
//!
//! Lint reports every remote action whose ref is not a full commit hash.
//! Fix resolves each such ref through the shared [`Resolver`] and rewrites
//! it in place as `owner/repo@<sha> # <tag>`. A bare major version such as
//! `v4` is pinned to the newest release inside that major series.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Issue, Linter};
use crate::actions::{is_major_version_only, ActionReference, Resolver};
use crate::error::{Error, Result};
use crate::workflow::Workflow;

/// Reports and pins unpinned action references.
pub struct VersionsLinter {
    resolver: Arc<dyn Resolver>,
}

impl VersionsLinter {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    /// Resolve a ref to `(hash, tag)`; the tag becomes the trailing comment.
    async fn resolve(&self, action: &ActionReference) -> Result<(String, String)> {
        let reference = action.reference.trim_start_matches("tags/");
        let wrap = |source| Error::CommitResolution {
            uses: action.to_string(),
            source,
        };

        if is_major_version_only(reference) {
            match self
                .resolver
                .resolve_latest_minor_in_major(&action.owner, &action.repo, reference)
                .await
            {
                Ok(resolved) => return Ok((resolved.hash, resolved.tag)),
                Err(e) if e.is_cancelled() => return Err(wrap(e)),
                Err(e) => debug!("No minor release for {}: {}", action, e),
            }
        }

        let hash = self
            .resolver
            .resolve_commit_hash(&action.owner, &action.repo, reference)
            .await
            .map_err(wrap)?;
        Ok((hash, reference.to_string()))
    }
}

#[async_trait]
impl Linter for VersionsLinter {
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>> {
        let file = workflow.base_name();
        let mut issues = Vec::new();
        for found in workflow.find_action_references()? {
            let Ok(action) = ActionReference::parse(&found.uses) else {
                continue;
            };
            if action.is_pinned() {
                continue;
            }
            issues.push(Issue::new(
                file.clone(),
                found.line,
                format!(
                    "Action {} uses version tag '{}' instead of commit hash",
                    found.uses, action.reference
                ),
            ));
        }
        Ok(issues)
    }

    async fn fix_workflow(&self, workflow: &mut Workflow) -> Result<()> {
        let mut seen = HashSet::new();
        let pending: Vec<String> = workflow
            .find_action_references()?
            .into_iter()
            .map(|found| found.uses)
            .filter(|uses| seen.insert(uses.clone()))
            .collect();

        for uses in pending {
            let Ok(action) = ActionReference::parse(&uses) else {
                continue;
            };
            if action.is_pinned() {
                continue;
            }

            let (hash, tag) = self.resolve(&action).await?;
            let pinned = action.with_ref(&hash);
            workflow
                .update_reference(&uses, &pinned, Some(&tag))
                .map_err(|e| Error::UpdateFailed {
                    file: workflow.path().to_path_buf(),
                    source: Box::new(e),
                })?;
            info!("Pinned {} to {} ({})", uses, hash, tag);
        }

        if workflow.normalize_comment_spacing() {
            workflow.save()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{MockResolver, ResolveError, ResolvedVersion};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const HASH: &str = "b4ffde65f46336ab88eb53be808477a3936bae11";

    const WORKFLOW: &str = "\
name: CI
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - uses: ./local-action
      - uses: docker://alpine:3.19
      - uses: actions/cache@b4ffde65f46336ab88eb53be808477a3936bae11 # v4.0.0
      - uses: actions/setup-node@v4
";

    fn on_disk(content: &str) -> (TempDir, Workflow) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ci.yml");
        std::fs::write(&path, content).unwrap();
        let wf = Workflow::load(&path).unwrap();
        (dir, wf)
    }

    #[tokio::test]
    async fn test_lint_reports_unpinned_only() {
        let linter = VersionsLinter::new(Arc::new(MockResolver::new()));
        let wf = Workflow::from_source("ci.yml", WORKFLOW).unwrap();
        let issues = linter.lint_workflow(&wf).await.unwrap();
        let found: Vec<(usize, &str)> = issues.iter().map(|i| (i.line, i.message.as_str())).collect();
        assert_eq!(
            found,
            vec![
                (7, "Action actions/checkout@v3 uses version tag 'v3' instead of commit hash"),
                (11, "Action actions/setup-node@v4 uses version tag 'v4' instead of commit hash"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fix_pins_tag_and_major() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve_latest_minor_in_major()
            .with(eq("actions"), eq("checkout"), eq("v3"))
            .times(1)
            .returning(|_, _, _| Ok(ResolvedVersion::new("v3.5.0", HASH)));
        resolver
            .expect_resolve_latest_minor_in_major()
            .with(eq("actions"), eq("setup-node"), eq("v4"))
            .times(1)
            .returning(|_, _, _| {
                Err(ResolveError::NoMajorTags {
                    owner: "actions".into(),
                    repo: "setup-node".into(),
                    major: "4".into(),
                })
            });
        resolver
            .expect_resolve_commit_hash()
            .with(eq("actions"), eq("setup-node"), eq("v4"))
            .times(1)
            .returning(|_, _, _| Ok("1111111111111111111111111111111111111111".to_string()));

        let linter = VersionsLinter::new(Arc::new(resolver));
        let (_dir, mut wf) = on_disk(WORKFLOW);
        linter.fix_workflow(&mut wf).await.unwrap();

        let raw = wf.raw().to_string();
        assert!(raw.contains(&format!("actions/checkout@{HASH} # v3.5.0")));
        assert!(!raw.contains("actions/checkout@v3"));
        assert!(raw.contains("actions/setup-node@1111111111111111111111111111111111111111 # v4"));
        assert!(raw.contains("./local-action"));
        assert_eq!(std::fs::read_to_string(wf.path()).unwrap(), raw);
        assert!(linter.lint_workflow(&wf).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fix_resolves_duplicates_once() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve_commit_hash()
            .with(eq("actions"), eq("checkout"), eq("main"))
            .times(1)
            .returning(|_, _, _| Ok(HASH.to_string()));

        let linter = VersionsLinter::new(Arc::new(resolver));
        let (_dir, mut wf) = on_disk(
            "jobs:\n  a:\n    steps:\n      - uses: actions/checkout@main\n  b:\n    steps:\n      - uses: actions/checkout@main\n",
        );
        linter.fix_workflow(&mut wf).await.unwrap();
        assert_eq!(wf.raw().matches(&format!("@{HASH} # main")).count(), 2);
    }

    #[tokio::test]
    async fn test_fix_error_names_action() {
        let mut resolver = MockResolver::new();
        resolver.expect_resolve_commit_hash().returning(|o, r, reference| {
            Err(ResolveError::RefNotFound {
                owner: o.to_string(),
                repo: r.to_string(),
                reference: reference.to_string(),
            })
        });

        let linter = VersionsLinter::new(Arc::new(resolver));
        let (_dir, mut wf) = on_disk("steps:\n  - uses: acme/missing@release\n");
        let err = linter.fix_workflow(&mut wf).await.unwrap_err();
        assert!(matches!(err, Error::CommitResolution { .. }));
        assert!(err.to_string().starts_with("failed to get commit hash for acme/missing@release"));
        assert!(wf.raw().contains("acme/missing@release"));
    }

    #[tokio::test]
    async fn test_fix_stops_on_cancellation() {
        let mut resolver = MockResolver::new();
        resolver
            .expect_resolve_latest_minor_in_major()
            .returning(|_, _, _| Err(ResolveError::Cancelled));
        resolver.expect_resolve_commit_hash().never();

        let linter = VersionsLinter::new(Arc::new(resolver));
        let (_dir, mut wf) = on_disk("steps:\n  - uses: actions/checkout@v4\n");
        let err = linter.fix_workflow(&mut wf).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
