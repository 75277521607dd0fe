//! Line-level text helpers shared by the workflow model and the linters.

use once_cell::sync::Lazy;
use regex::Regex;

static CRYPTIC_ENDS_WITH_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+\d+$").expect("valid regex"));
static CRYPTIC_SHORT_LOWERCASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]{1,4}$").expect("valid regex"));

/// Returns true if the line is a YAML comment.
pub fn is_comment(line: &str) -> bool {
    line.trim().starts_with('#')
}

/// Returns true if the line is empty, whitespace only, or a YAML comment.
pub fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Number of leading space characters (tabs are not counted).
pub fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Returns true if the line ends with a space or a tab.
pub fn has_trailing_whitespace(line: &str) -> bool {
    line.ends_with(' ') || line.ends_with('\t')
}

/// Heuristic for identifiers that say nothing about what they do (`j1`, `job2`, `abc`).
pub fn is_cryptic_name(name: &str) -> bool {
    name.len() < 3
        || CRYPTIC_ENDS_WITH_NUMBER.is_match(name)
        || CRYPTIC_SHORT_LOWERCASE.is_match(name)
}
