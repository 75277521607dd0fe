//! Lint command
//!
//! This module implements the `lint` subcommand: run the enabled linters
//! and optionally fix what can be fixed.

use super::{CommandContext, Runnable};
use anyhow::{Context, Result};
use clap::Parser;
use github_ci::actions::CacheStats;
use github_ci::linter::{supports_auto_fix, FixReport, Issue, WorkflowLinter};
use github_ci::workflow::{self, DEFAULT_WORKFLOWS_DIR};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the lint command
#[derive(Parser, Debug, Clone)]
pub struct LintArgs {
    /// Workflow file or directory of workflows
    #[arg(default_value = DEFAULT_WORKFLOWS_DIR)]
    pub path: PathBuf,

    /// Fix what can be fixed (pin action versions, repair formatting)
    #[arg(long)]
    pub fix: bool,
}

#[derive(Serialize)]
struct LintReport<'a> {
    issues: &'a [Issue],
    #[serde(skip_serializing_if = "Option::is_none")]
    fixed: Option<&'a [Issue]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<CacheStats>,
}

impl LintArgs {
    /// Execute the lint command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let workflows = workflow::discover(&self.path).context("failed to load workflows")?;
        ctx.output.info(&format!(
            "Linting {} workflow(s) in {}",
            workflows.len(),
            self.path.display()
        ));

        let mut linter =
            WorkflowLinter::new(workflows, ctx.resolver()).with_config(Arc::clone(&ctx.config));
        let issues_exit_code = ctx.config.issues_exit_code();

        if self.fix {
            return self.fix_and_report(ctx, &mut linter, issues_exit_code).await;
        }

        let issues = match linter.lint().await {
            Ok(issues) => issues,
            Err(e) => {
                ctx.output.error(&format!("failed to lint workflows: {e}"));
                return Ok(1);
            }
        };

        if ctx.output.is_json() {
            ctx.output.json(&LintReport { issues: &issues, fixed: None, cache: None })?;
            return Ok(if issues.is_empty() { 0 } else { issues_exit_code });
        }
        if issues.is_empty() {
            ctx.output.summary("0 issues.", true);
            return Ok(0);
        }

        print_section(ctx, "Issues", &issues, false);
        if issues.iter().any(|i| supports_auto_fix(&i.linter)) {
            ctx.output.plan("");
            ctx.output.hint("Run with --fix to automatically fix some issues");
        }
        if ctx.verbosity > 0 {
            ctx.output.cache_stats(&linter.cache_stats());
        }
        print_summary(ctx, issues.len());
        ctx.output.flush();
        Ok(issues_exit_code)
    }

    async fn fix_and_report(
        &self,
        ctx: &mut CommandContext,
        linter: &mut WorkflowLinter,
        issues_exit_code: i32,
    ) -> Result<i32> {
        let FixReport { fixed, remaining } = match linter.lint_and_fix().await {
            Ok(report) => report,
            Err(e) => {
                ctx.output.error(&format!("failed to fix workflows: {e}"));
                return Ok(1);
            }
        };
        let stats = linter.cache_stats();
        let exit_code = if remaining.is_empty() { 0 } else { issues_exit_code };

        if ctx.output.is_json() {
            ctx.output.json(&LintReport {
                issues: &remaining,
                fixed: Some(&fixed),
                cache: Some(stats),
            })?;
            return Ok(exit_code);
        }
        if fixed.is_empty() && remaining.is_empty() {
            ctx.output.summary("0 issues.", true);
            return Ok(0);
        }

        print_section(ctx, "Fixed", &fixed, true);
        if !fixed.is_empty() && !remaining.is_empty() {
            ctx.output.plan("");
        }
        print_section(ctx, "Issues", &remaining, false);
        ctx.output.cache_stats(&stats);
        print_summary(ctx, remaining.len());
        ctx.output.flush();
        Ok(exit_code)
    }
}

fn print_section(ctx: &CommandContext, title: &str, issues: &[Issue], success: bool) {
    if issues.is_empty() {
        return;
    }
    ctx.output.section(title, success);
    for issue in issues {
        ctx.output.issue(issue);
    }
}

fn print_summary(ctx: &CommandContext, count: usize) {
    ctx.output.plan("");
    ctx.output.summary(&format!("{count} issue(s)."), count == 0);
}

#[async_trait::async_trait]
impl Runnable for LintArgs {
    async fn run(&self, ctx: &mut CommandContext) -> Result<i32> {
        self.execute(ctx).await
    }
}
