//! Version tag handling.
//!
//! Tags on action repositories are loosely versioned (`v4`, `v4.1`, `v4.1.7`,
//! `1.0.0-beta`). This module only provides what selecting and filtering tags
//! requires: normalization, a dotted numeric total order, component extraction
//! and the `^`/`~` pattern rules used by upgrade constraints.

use std::cmp::Ordering;

/// Strips surrounding whitespace and a leading `v`/`V`.
pub fn normalize(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Numeric value of a dotted component: its leading digits, or 0.
fn component_value(component: &str) -> u64 {
    let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn components(version: &str) -> Vec<u64> {
    let normalized = normalize(version);
    if normalized.is_empty() {
        return Vec::new();
    }
    normalized.split('.').map(component_value).collect()
}

/// Compares two version strings as dotted numeric sequences.
///
/// A missing component sorts below any present one, so `v3 < v3.0 < v3.0.1`.
/// Strings with identical numeric components are ordered by their raw text so
/// that the order is total and selecting a maximum is deterministic.
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = components(a);
    let right = components(b);

    for (l, r) in left.iter().zip(right.iter()) {
        match l.cmp(r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    left.len()
        .cmp(&right.len())
        .then_with(|| a.trim().cmp(b.trim()))
}

/// Major component of a version (`v4.1.7` -> 4). Unparseable input yields 0.
pub fn major(version: &str) -> u64 {
    components(version).first().copied().unwrap_or(0)
}

/// Major and minor components (`v4.1.7` -> (4, 1)). Missing parts are 0.
pub fn major_minor(version: &str) -> (u64, u64) {
    let parts = components(version);
    (
        parts.first().copied().unwrap_or(0),
        parts.get(1).copied().unwrap_or(0),
    )
}

/// Returns true for strings that look like a version tag: `v1`, `V2.0`, `1.0.0`.
pub fn is_version_tag(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some('v' | 'V') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_digit(),
        None => false,
    }
}

/// Checks a candidate version against an upgrade constraint.
///
/// | pattern   | matches                                   |
/// |-----------|-------------------------------------------|
/// | empty     | everything                                |
/// | `^1.x.x`  | any major >= 1                            |
/// | `^X.x.x`  | major X only                              |
/// | `~X.Y.x`  | major X and minor Y only                  |
/// | other     | nothing                                   |
pub fn matches_pattern(version: &str, pattern: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return true;
    }

    if let Some(base) = pattern.strip_prefix('^') {
        let pattern_major = major(base);
        let candidate_major = major(version);
        // ^1.0.0 acts as "no minimum beyond 1.x"
        if pattern_major == 1 {
            return candidate_major >= 1;
        }
        return candidate_major == pattern_major;
    }

    if let Some(base) = pattern.strip_prefix('~') {
        return major_minor(version) == major_minor(base);
    }

    false
}
