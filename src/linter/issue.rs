//! Lint issues and their fix classification.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

/// A problem found in a workflow file.
///
/// Two issues are the same issue when file, line, linter and message all
/// match; that identity is what separates fixed from remaining issues after
/// a fix pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Issue {
    /// Workflow file name
    pub file: String,
    /// 1-based line, 0 for file-level issues
    pub line: usize,
    /// Registered name of the linter that reported it
    pub linter: String,
    /// Human-readable description
    pub message: String,
}

impl Issue {
    /// Create an issue. The linter name is filled in by the orchestrator.
    pub fn new(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            linter: String::new(),
            message: message.into(),
        }
    }

    /// Tag the issue with the linter that produced it.
    pub fn with_linter(mut self, linter: impl Into<String>) -> Self {
        self.linter = linter.into();
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "{}:{}: ({}) {}", self.file, self.line, self.linter, self.message)
        } else {
            write!(f, "{}: ({}) {}", self.file, self.linter, self.message)
        }
    }
}

/// Split `original` into `(fixed, unfixed)`: an issue is unfixed if it is
/// still present in `remaining`. Order of `original` is preserved.
pub fn classify_issues(original: &[Issue], remaining: &[Issue]) -> (Vec<Issue>, Vec<Issue>) {
    let remaining: HashSet<&Issue> = remaining.iter().collect();
    original
        .iter()
        .cloned()
        .partition(|issue| !remaining.contains(issue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display() {
        let issue = Issue::new("ci.yml", 12, "Line has trailing whitespace").with_linter("format");
        assert_eq!(issue.to_string(), "ci.yml:12: (format) Line has trailing whitespace");

        let issue = Issue::new("ci.yml", 0, "Workflow is missing permissions configuration")
            .with_linter("permissions");
        assert_eq!(
            issue.to_string(),
            "ci.yml: (permissions) Workflow is missing permissions configuration"
        );
    }

    #[test]
    fn test_identity_uses_all_fields() {
        let a = Issue::new("ci.yml", 3, "msg").with_linter("format");
        assert_eq!(a, a.clone());
        assert_ne!(a, Issue::new("ci.yml", 4, "msg").with_linter("format"));
        assert_ne!(a, Issue::new("ci.yml", 3, "msg").with_linter("style"));
        assert_ne!(a, Issue::new("ci.yaml", 3, "msg").with_linter("format"));
    }

    #[test]
    fn test_classify() {
        let a = Issue::new("ci.yml", 1, "a").with_linter("format");
        let b = Issue::new("ci.yml", 2, "b").with_linter("versions");
        let c = Issue::new("ci.yml", 0, "c").with_linter("permissions");

        let (fixed, unfixed) = classify_issues(&[a.clone(), b.clone(), c.clone()], &[c.clone()]);
        assert_eq!(fixed, vec![a, b]);
        assert_eq!(unfixed, vec![c]);
    }

    fn issue_strategy() -> impl Strategy<Value = Issue> {
        (0usize..4, "[ab]", "[xyz]").prop_map(|(line, linter, message)| {
            Issue::new("ci.yml", line, message).with_linter(linter)
        })
    }

    proptest! {
        #[test]
        fn test_classification_partitions_first_pass(
            first in prop::collection::vec(issue_strategy(), 0..12),
            second in prop::collection::vec(issue_strategy(), 0..12),
        ) {
            let (fixed, unfixed) = classify_issues(&first, &second);
            prop_assert_eq!(fixed.len() + unfixed.len(), first.len());
            for issue in &unfixed {
                prop_assert!(second.contains(issue));
            }
            for issue in &fixed {
                prop_assert!(!second.contains(issue));
            }
            let expected_unfixed: Vec<Issue> =
                first.iter().filter(|i| second.contains(i)).cloned().collect();
            prop_assert_eq!(unfixed, expected_unfixed);
        }
    }
}
