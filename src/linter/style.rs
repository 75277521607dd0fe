//! Naming and layout conventions.

use async_trait::async_trait;
use serde_yaml::Value;

use super::{Issue, Linter};
use crate::config::StyleSettings;
use crate::error::Result;
use crate::textutil::{is_cryptic_name, leading_spaces};
use crate::workflow::Workflow;

const WORKFLOW: &str = "Workflow";
const JOB: &str = "Job";
const STEP: &str = "Step";

/// How far below a step's first line to look for its `name:` key.
const NAME_LOOKAHEAD: usize = 10;

/// Workflow, job and step naming plus a few step layout rules.
#[derive(Debug, Clone)]
pub struct StyleLinter {
    settings: StyleSettings,
}

impl StyleLinter {
    pub fn new(settings: StyleSettings) -> Self {
        Self { settings }
    }

    fn check_name(&self, name: &str, context: &str, file: &str, line: usize, issues: &mut Vec<Issue>) {
        if let Some(message) = self.name_length_problem(name, context) {
            issues.push(Issue::new(file, line, message));
        }
        if let Some(message) = self.convention_problem(name, context) {
            issues.push(Issue::new(file, line, message));
        }
    }

    fn name_length_problem(&self, name: &str, context: &str) -> Option<String> {
        let length = name.chars().count();
        let (min, max) = (self.settings.min_name_length, self.settings.max_name_length);
        if min > 0 && length < min {
            Some(format!("{context} name '{name}' is too short (min {min} chars)"))
        } else if max > 0 && length > max {
            Some(format!("{context} name exceeds maximum length of {max} characters"))
        } else {
            None
        }
    }

    fn convention_problem(&self, name: &str, context: &str) -> Option<String> {
        let starts_upper = |word: &str| word.chars().next().is_some_and(char::is_uppercase);
        let mut words = name.split_whitespace().peekable();
        words.peek()?;

        match self.settings.naming_convention.as_str() {
            "title" if !words.all(starts_upper) => {
                Some(format!("{context} name should use Title Case"))
            }
            "sentence" if !words.next().is_some_and(starts_upper) => {
                Some(format!("{context} name should start with uppercase (sentence case)"))
            }
            _ => None,
        }
    }

    fn check_steps(
        &self,
        workflow: &Workflow,
        lines: &[&str],
        job_id: &str,
        steps: &[Value],
        issues: &mut Vec<Issue>,
    ) {
        let file = workflow.base_name();
        let mut checkout_seen = false;

        for (idx, step) in steps.iter().enumerate() {
            if !step.is_mapping() {
                continue;
            }
            let line = workflow.find_step_line(job_id, idx);
            let name = step.get("name").and_then(Value::as_str).unwrap_or_default();
            let uses = step.get("uses").and_then(Value::as_str).unwrap_or_default();

            if name.is_empty() {
                if self.settings.require_step_names {
                    issues.push(Issue::new(file.as_str(), line, "Step is missing a name"));
                }
            } else {
                self.check_name(name, STEP, &file, line, issues);
            }

            if self.settings.checkout_first {
                let is_checkout = uses.contains("actions/checkout");
                if is_checkout && !checkout_seen && idx > 0 {
                    issues.push(Issue::new(
                        file.as_str(),
                        line,
                        "Checkout action should typically be the first step",
                    ));
                }
                checkout_seen |= is_checkout;
            }

            if name_not_first(lines, line) {
                issues.push(Issue::new(
                    file.as_str(),
                    line,
                    "Step 'name' should come first before other fields",
                ));
            }

            let script = step.get("run").and_then(Value::as_str).unwrap_or_default();
            let max = self.settings.max_run_lines;
            if max > 0 && !script.is_empty() {
                let count = script.trim().matches('\n').count() + 1;
                if count > max {
                    issues.push(Issue::new(
                        file.as_str(),
                        line,
                        format!(
                            "Run script has {count} lines (max {max}); consider extracting to a script file"
                        ),
                    ));
                }
            }
        }
    }
}

/// Returns true if the step starting at 1-based `line` has a `name:` key
/// that is not its first key.
fn name_not_first(lines: &[&str], line: usize) -> bool {
    let Some(first) = line.checked_sub(1).and_then(|idx| lines.get(idx)) else {
        return false;
    };
    let trimmed = first.trim();
    if !trimmed.starts_with("- ") || trimmed.starts_with("- name:") {
        return false;
    }

    let indent = leading_spaces(first);
    lines
        .iter()
        .skip(line)
        .take(NAME_LOOKAHEAD - 1)
        .take_while(|next| !next.trim().starts_with("- ") && leading_spaces(next) > indent)
        .any(|next| next.trim().starts_with("name:"))
}

#[async_trait]
impl Linter for StyleLinter {
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>> {
        let file = workflow.base_name();
        let content = workflow.content();
        let lines: Vec<&str> = workflow.lines().collect();
        let mut issues = Vec::new();

        match content.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => self.check_name(name, WORKFLOW, &file, 1, &mut issues),
            None => issues.push(Issue::new(file.as_str(), 1, "Workflow is missing a name")),
        }

        for (job_id, job) in &content.jobs {
            if !job.is_mapping() {
                continue;
            }
            let line = workflow.find_job_line(job_id);
            match job.get("name").and_then(Value::as_str).filter(|n| !n.is_empty()) {
                Some(name) => self.check_name(name, JOB, &file, line, &mut issues),
                None if is_cryptic_name(job_id) => issues.push(Issue::new(
                    file.as_str(),
                    line,
                    format!("Job '{job_id}' has cryptic ID and is missing a name"),
                )),
                None => {}
            }

            if let Some(steps) = job.get("steps").and_then(Value::as_sequence) {
                self.check_steps(workflow, &lines, job_id, steps, &mut issues);
            }
        }

        let workflow_env = workflow.workflow_env();
        for (job_id, job) in &content.jobs {
            let Some(env) = job.get("env").and_then(Value::as_mapping) else {
                continue;
            };
            let line = workflow.find_job_line(job_id);
            for name in env.keys().filter_map(Value::as_str) {
                if workflow_env.iter().any(|w| w == name) {
                    issues.push(Issue::new(
                        file.as_str(),
                        line,
                        format!("Job env var '{name}' shadows workflow-level env var"),
                    ));
                }
            }
        }

        Ok(issues)
    }
}
