//! Line-oriented formatting checks and repair.
//!
//! The check never builds a tree: it walks raw lines and compares each
//! indentation with the previous significant line. The fix rewrites the
//! whole file and is idempotent, so running it twice changes nothing the
//! second time.

use async_trait::async_trait;
use tracing::debug;

use super::{Issue, Linter};
use crate::config::FormatSettings;
use crate::error::Result;
use crate::textutil::{has_trailing_whitespace, is_blank_or_comment, is_comment, leading_spaces};
use crate::workflow::Workflow;

/// Indentation, blank line, trailing whitespace and line length checks.
#[derive(Debug, Clone)]
pub struct FormatLinter {
    settings: FormatSettings,
}

impl FormatLinter {
    pub fn new(settings: FormatSettings) -> Self {
        Self { settings }
    }

    fn indent_width(&self) -> usize {
        self.settings.indent_width.max(1)
    }

    /// Collect `(line, message)` findings for the given lines.
    fn check(&self, lines: &[&str]) -> Vec<(usize, String)> {
        let width = self.indent_width();
        let base = lines
            .iter()
            .filter(|line| !is_blank_or_comment(line))
            .map(|line| leading_spaces(line))
            .filter(|&indent| indent > 0)
            .min()
            .unwrap_or(0);

        let mut findings = Vec::new();
        let mut prev_blank = false;
        let mut prev_indent = 0;

        for (idx, line) in lines.iter().enumerate() {
            let number = idx + 1;
            let blank = line.trim().is_empty();
            if blank && prev_blank {
                findings.push((number, "Multiple consecutive blank lines found".to_string()));
            }
            prev_blank = blank;

            if has_trailing_whitespace(line) {
                findings.push((number, "Line has trailing whitespace".to_string()));
            }

            let length = line.chars().count();
            let max = self.settings.max_line_length;
            if max > 0 && length > max {
                findings.push((
                    number,
                    format!("Line exceeds maximum length of {max} characters (found {length})"),
                ));
            }

            if is_blank_or_comment(line) {
                continue;
            }
            let indent = leading_spaces(line);
            if let Some(message) = indentation_problem(line, indent, prev_indent, base, width) {
                findings.push((number, message));
            }
            prev_indent = indent;
        }
        findings
    }

    /// The repaired text of a whole file.
    fn format(&self, raw: &str) -> String {
        let width = self.indent_width();
        let trimmed: Vec<&str> = raw
            .split('\n')
            .map(|line| line.trim_end_matches([' ', '\t']))
            .collect();

        let mut out: Vec<String> = Vec::with_capacity(trimmed.len());
        // (original indent, rewritten indent) of the enclosing lines
        let mut levels: Vec<(usize, usize)> = vec![(0, 0)];

        for line in trimmed {
            if line.is_empty() {
                if out.last().is_some_and(|prev| prev.is_empty()) {
                    continue;
                }
                out.push(String::new());
                continue;
            }
            if is_comment(line) {
                out.push(line.to_string());
                continue;
            }

            let indent = leading_spaces(line);
            while levels.len() > 1 && levels.last().is_some_and(|&(orig, _)| orig > indent) {
                levels.pop();
            }
            let (parent_orig, parent_new) = levels.last().copied().unwrap_or((0, 0));
            let new_indent = if indent == parent_orig {
                parent_new
            } else {
                let step = indent.saturating_sub(parent_orig).min(width);
                let new_indent = parent_new + step;
                levels.push((indent, new_indent));
                new_indent
            };

            if new_indent == indent {
                out.push(line.to_string());
            } else {
                out.push(format!("{}{}", " ".repeat(new_indent), &line[indent..]));
            }
        }

        while out.last().is_some_and(|line| line.is_empty()) {
            out.pop();
        }
        if out.is_empty() {
            return String::new();
        }
        let mut formatted = out.join("\n");
        formatted.push('\n');
        formatted
    }
}

fn indentation_problem(
    line: &str,
    indent: usize,
    prev_indent: usize,
    base: usize,
    width: usize,
) -> Option<String> {
    let leading = &line[..line.len() - line.trim_start().len()];
    if leading.contains('\t') {
        return Some(format!("Line uses tabs for indentation, expected {width} spaces"));
    }
    if indent % width != 0 {
        return Some(format!(
            "Line indentation is {indent} spaces, expected multiple of {width}"
        ));
    }
    if base > 0 && base != width && indent == base {
        return Some(format!(
            "Line uses {indent} spaces for base indentation, expected {width} spaces"
        ));
    }
    if indent > prev_indent && indent - prev_indent != width {
        return Some(format!(
            "Line indentation increased by {} spaces, expected increase of {} (should be {} spaces)",
            indent - prev_indent,
            width,
            prev_indent + width
        ));
    }
    None
}

#[async_trait]
impl Linter for FormatLinter {
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>> {
        let file = workflow.base_name();
        let lines: Vec<&str> = workflow.lines().collect();
        Ok(self
            .check(&lines)
            .into_iter()
            .map(|(line, message)| Issue::new(file.clone(), line, message))
            .collect())
    }

    async fn fix_workflow(&self, workflow: &mut Workflow) -> Result<()> {
        let formatted = self.format(workflow.raw());
        if formatted == workflow.raw() {
            return Ok(());
        }
        debug!("Reformatted {}", workflow.base_name());
        workflow.set_raw(formatted);
        workflow.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn linter() -> FormatLinter {
        FormatLinter::new(FormatSettings::default())
    }

    fn messages(content: &str) -> Vec<(usize, String)> {
        let lines: Vec<&str> = content.split('\n').collect();
        linter().check(&lines)
    }

    #[test]
    fn test_clean_file() {
        let content = "name: CI\non: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - run: echo hi\n";
        assert!(messages(content).is_empty());
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let found = messages("name: CI  \n\n\non: push\n");
        assert_eq!(
            found,
            vec![
                (1, "Line has trailing whitespace".to_string()),
                (3, "Multiple consecutive blank lines found".to_string()),
            ]
        );
    }

    #[test]
    fn test_line_length() {
        let linter = FormatLinter::new(FormatSettings {
            indent_width: 2,
            max_line_length: 10,
        });
        let found = linter.check(&["name: a long workflow"]);
        assert_eq!(
            found,
            vec![(1, "Line exceeds maximum length of 10 characters (found 21)".to_string())]
        );
    }

    #[test]
    fn test_indentation_checks() {
        assert_eq!(
            messages("jobs:\n\tbuild:\n")[0].1,
            "Line uses tabs for indentation, expected 2 spaces"
        );
        assert_eq!(
            messages("jobs:\n  build:\n   x: 1\n")[0],
            (3, "Line indentation is 3 spaces, expected multiple of 2".to_string())
        );
        assert_eq!(
            messages("jobs:\n  build:\n      x: 1\n")[0],
            (
                3,
                "Line indentation increased by 4 spaces, expected increase of 2 (should be 4 spaces)"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_short_increase_after_misaligned_line() {
        let found = linter().check(&["a:", "   b: 1", "    c: 2"]);
        assert_eq!(
            found,
            vec![
                (2, "Line indentation is 3 spaces, expected multiple of 2".to_string()),
                (
                    3,
                    "Line indentation increased by 1 spaces, expected increase of 2 (should be 5 spaces)"
                        .to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_base_indentation() {
        let found = messages("jobs:\n    build:\n        runs-on: ubuntu-latest\n");
        assert_eq!(
            found,
            vec![
                (2, "Line uses 4 spaces for base indentation, expected 2 spaces".to_string()),
                (
                    3,
                    "Line indentation increased by 4 spaces, expected increase of 2 (should be 6 spaces)"
                        .to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_comments_do_not_move_indentation() {
        assert!(messages("jobs:\n        # note\n  build:\n    x: 1\n").is_empty());
    }

    #[test]
    fn test_format_fixes_indentation() {
        let formatted = linter().format("jobs:\n    build:\n        runs-on: ubuntu-latest");
        assert_eq!(formatted, "jobs:\n  build:\n    runs-on: ubuntu-latest\n");
    }

    #[test]
    fn test_format_keeps_siblings_aligned() {
        let formatted = linter().format(
            "jobs:\n    build:\n        steps:\n            - run: make\n    test:\n        runs-on: x\n",
        );
        assert_eq!(
            formatted,
            "jobs:\n  build:\n    steps:\n      - run: make\n  test:\n    runs-on: x\n"
        );
    }

    #[test]
    fn test_format_blank_lines_and_whitespace() {
        let formatted = linter().format("name: CI   \n\n\n\non: push\t\n\n\n");
        assert_eq!(formatted, "name: CI\n\non: push\n");
    }

    #[test]
    fn test_format_is_idempotent() {
        let inputs = [
            "jobs:\n    build:\n        runs-on: ubuntu-latest\n\n\n",
            "a:\n     b:\n          c: 1\n  # comment  \n     d: 2\n",
            "",
            "\n\n",
        ];
        for input in inputs {
            let once = linter().format(input);
            assert_eq!(linter().format(&once), once);
        }
    }

    #[tokio::test]
    async fn test_fix_saves_only_on_change() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ci.yml");
        std::fs::write(&path, "jobs:\n    build:\n        runs-on: ubuntu-latest\n").unwrap();

        let mut wf = Workflow::load(&path).unwrap();
        linter().fix_workflow(&mut wf).await.unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "jobs:\n  build:\n    runs-on: ubuntu-latest\n");
        assert!(linter().lint_workflow(&wf).await.unwrap().is_empty());

        std::fs::remove_file(&path).unwrap();
        linter().fix_workflow(&mut wf).await.unwrap();
        assert!(!path.exists());
    }
}
