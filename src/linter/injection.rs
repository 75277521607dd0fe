//! Shell injection through untrusted expressions.
//!
//! Values such as an issue title or a pull request branch name are chosen
//! by whoever opens the issue or pull request. Interpolating them with
//! `${{ }}` directly into a `run:` script lets that person inject shell
//! commands; they should be passed through an environment variable instead.
//!
//! The scan is a small line state machine: it enters a run block at a
//! `run:` key, leaves it at the next step boundary at or above the key's
//! indentation, and ignores `env:` blocks nested inside the step.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Issue, Linter};
use crate::error::Result;
use crate::textutil::{is_blank_or_comment, leading_spaces};
use crate::workflow::Workflow;

const UNTRUSTED_CONTEXTS: &[&str] = &[
    "github.event.issue.title",
    "github.event.issue.body",
    "github.event.pull_request.title",
    "github.event.pull_request.body",
    "github.event.pull_request.head.ref",
    "github.event.pull_request.head.label",
    "github.event.pull_request.head.repo.default_branch",
    "github.event.comment.body",
    "github.event.review.body",
    "github.event.review_comment.body",
    "github.event.discussion.title",
    "github.event.discussion.body",
    "github.event.head_commit.message",
    "github.event.head_commit.author.name",
    "github.event.head_commit.author.email",
    "github.event.commits[*].message",
    "github.event.commits[*].author.name",
    "github.event.commits[*].author.email",
    "github.head_ref",
    "github.event.pages[*].source.path",
    "github.event.*.author.name",
    "github.event.*.author.email",
];

static UNTRUSTED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    UNTRUSTED_CONTEXTS
        .iter()
        .map(|context| {
            let context = regex::escape(context).replace(r"\*", "[^}]+");
            Regex::new(&format!(r"\$\{{\{{\s*{context}\s*\}}\}}")).expect("valid regex")
        })
        .collect()
});

const RUN_KEYS: &[&str] = &["run:", "run :", "- run:", "- run :"];
const STEP_BOUNDARIES: &[&str] = &["- name:", "- uses:", "- run:", "- if:", "- id:"];
const STEP_KEYS: &[&str] = &[
    "env:",
    "name:",
    "with:",
    "if:",
    "id:",
    "uses:",
    "continue-on-error:",
    "timeout-minutes:",
    "working-directory:",
    "shell:",
];
const BLOCK_INDICATORS: &[&str] = &["|", "|-", "|+", ">", ">-", ">+"];

fn starts_with_any(text: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| text.starts_with(p))
}

/// Text after the `run:` key, or `None` for a block scalar header.
fn inline_script(trimmed: &str) -> Option<&str> {
    let (_, rest) = trimmed
        .split_once("run:")
        .or_else(|| trimmed.split_once("run :"))?;
    let rest = rest.trim();
    if rest.is_empty() || BLOCK_INDICATORS.contains(&rest) {
        return None;
    }
    Some(rest)
}

/// The first untrusted expression in `text`.
fn find_untrusted(text: &str) -> Option<&str> {
    if !text.contains("${{") {
        return None;
    }
    UNTRUSTED_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str())
}

#[derive(Default)]
struct RunScanner {
    in_run: bool,
    in_env: bool,
    run_indent: usize,
    env_indent: usize,
}

impl RunScanner {
    /// Feed one significant line; returns the script text to inspect, if any.
    fn feed<'a>(&mut self, line: &'a str) -> Option<&'a str> {
        let trimmed = line.trim();
        let indent = leading_spaces(line);

        if self.in_env && indent <= self.env_indent {
            self.in_env = false;
        }
        if trimmed.starts_with("env:") {
            self.in_env = true;
            self.env_indent = indent;
            return None;
        }
        if self.in_run && indent <= self.run_indent && starts_with_any(trimmed, STEP_BOUNDARIES) {
            self.in_run = false;
            self.in_env = false;
        }

        if starts_with_any(trimmed, RUN_KEYS) {
            self.in_run = true;
            self.in_env = false;
            self.run_indent = indent;
            return inline_script(trimmed);
        }
        if self.in_run && !self.in_env && !starts_with_any(trimmed, STEP_KEYS) {
            return Some(line);
        }
        None
    }
}

/// Flags untrusted event data interpolated into `run:` scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct InjectionLinter;

#[async_trait]
impl Linter for InjectionLinter {
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>> {
        let file = workflow.base_name();
        let mut scanner = RunScanner::default();
        let mut issues = Vec::new();

        for (idx, line) in workflow.lines().enumerate() {
            if is_blank_or_comment(line) {
                continue;
            }
            let Some(expr) = scanner.feed(line).and_then(find_untrusted) else {
                continue;
            };
            issues.push(Issue::new(
                file.clone(),
                idx + 1,
                format!(
                    "Potential shell injection: {expr} in run command. Use an environment variable instead"
                ),
            ));
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn lint(content: &str) -> Vec<(usize, String)> {
        let wf = Workflow::from_source("ci.yml", content).unwrap();
        InjectionLinter
            .lint_workflow(&wf)
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.line, i.message))
            .collect()
    }

    #[test]
    fn test_patterns() {
        assert_eq!(
            find_untrusted("echo ${{ github.event.issue.title }}"),
            Some("${{ github.event.issue.title }}")
        );
        assert_eq!(
            find_untrusted("echo ${{github.event.commits[0].message}}"),
            Some("${{github.event.commits[0].message}}")
        );
        assert_eq!(
            find_untrusted("echo ${{ github.event.commits[*].message }}"),
            Some("${{ github.event.commits[*].message }}")
        );
        assert_eq!(
            find_untrusted("echo ${{ github.event.release.author.name }}"),
            Some("${{ github.event.release.author.name }}")
        );
        assert_eq!(find_untrusted("echo ${{ github.sha }}"), None);
        assert_eq!(find_untrusted("echo github.head_ref"), None);
    }

    #[test]
    fn test_inline_script() {
        assert_eq!(inline_script("- run: echo hi"), Some("echo hi"));
        assert_eq!(inline_script("run : make"), Some("make"));
        assert_eq!(inline_script("run: |"), None);
        assert_eq!(inline_script("- run: >-"), None);
    }

    #[tokio::test]
    async fn test_inline_run() {
        let found = lint(
            "jobs:\n  greet:\n    steps:\n      - run: echo \"${{ github.event.pull_request.title }}\"\n",
        )
        .await;
        assert_eq!(
            found,
            vec![(
                4,
                "Potential shell injection: ${{ github.event.pull_request.title }} in run command. Use an environment variable instead"
                    .to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_block_run_and_env() {
        let content = "\
jobs:
  greet:
    steps:
      - name: Greet
        env:
          TITLE: ${{ github.event.issue.title }}
        run: |
          echo \"$TITLE\"
          echo ${{ github.head_ref }}
      - name: Safe
        run: echo done
      - name: Uses env after run
        run: |
          echo ok
        env:
          BODY: ${{ github.event.issue.body }}
";
        let found = lint(content).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, 9);
        assert!(found[0].1.contains("${{ github.head_ref }}"));
    }

    #[tokio::test]
    async fn test_outside_run_is_ignored() {
        let content = "\
on: issues
jobs:
  label:
    if: contains(github.event.issue.title, 'bug')
    steps:
      - uses: actions/github-script@v7
        with:
          script: console.log(${{ github.event.issue.title }})
";
        assert!(lint(content).await.is_empty());
    }
}
