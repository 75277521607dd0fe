//! Hardcoded credential detection.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Issue, Linter};
use crate::error::Result;
use crate::textutil::is_blank_or_comment;
use crate::workflow::Workflow;

struct SecretPattern {
    kind: &'static str,
    regex: Regex,
}

// First match wins, so the specific shapes come before the generic ones.
static SECRET_PATTERNS: Lazy<Vec<SecretPattern>> = Lazy::new(|| {
    [
        ("API key", r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*['"]?[a-zA-Z0-9]{20,}['"]?"#),
        ("Token", r#"(?i)(token|access[_-]?token)\s*[:=]\s*['"]?[a-zA-Z0-9]{20,}['"]?"#),
        ("Secret", r#"(?i)(secret|secret[_-]?key)\s*[:=]\s*['"]?[a-zA-Z0-9]{20,}['"]?"#),
        ("Password", r#"(?i)(password|passwd|pwd)\s*[:=]\s*['"]?.{8,}['"]?"#),
        (
            "AWS key",
            r#"(?i)aws[_-]?(access[_-]?key[_-]?id|secret[_-]?access[_-]?key)\s*[:=]\s*['"]?[A-Z0-9]{20,}['"]?"#,
        ),
        ("GitHub personal access token", r"(?i)ghp_[a-zA-Z0-9]{36}"),
        ("GitHub token", r#"(?i)github[_-]?token\s*[:=]\s*['"]?[a-zA-Z0-9]{20,}['"]?"#),
        ("Private key", r"-----BEGIN\s+(RSA\s+)?PRIVATE\s+KEY-----"),
        (
            "Potential credential",
            r#"(?i)(key|credential|auth)\s*[:=]\s*['"]?[a-zA-Z0-9+/=]{32,}['"]?"#,
        ),
    ]
    .into_iter()
    .map(|(kind, pattern)| SecretPattern {
        kind,
        regex: Regex::new(pattern).expect("valid regex"),
    })
    .collect()
});

/// Returns true for lines that read a value from the secrets or env context.
fn references_context(line: &str) -> bool {
    line.contains("${{") && (line.contains("secrets.") || line.contains("env."))
}

/// Kind of credential the line appears to contain.
fn detect(line: &str) -> Option<&'static str> {
    if is_blank_or_comment(line) || references_context(line) {
        return None;
    }
    SECRET_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(line))
        .map(|p| p.kind)
}

/// Flags credentials written directly into a workflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecretsLinter;

#[async_trait]
impl Linter for SecretsLinter {
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>> {
        let file = workflow.base_name();
        Ok(workflow
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                detect(line).map(|kind| {
                    Issue::new(
                        file.clone(),
                        idx + 1,
                        format!("Potential hardcoded {kind} detected"),
                    )
                })
            })
            .collect())
    }
}
