//! Missing `permissions` check.

use async_trait::async_trait;

use super::{Issue, Linter};
use crate::error::Result;
use crate::workflow::Workflow;

/// Reports workflows that do not declare a top-level `permissions` block.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionsLinter;

#[async_trait]
impl Linter for PermissionsLinter {
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>> {
        if workflow.has_permissions() {
            return Ok(Vec::new());
        }
        Ok(vec![Issue::new(
            workflow.base_name(),
            0,
            "Workflow is missing permissions configuration",
        )])
    }
}
