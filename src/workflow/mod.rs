//! Workflow model
//!
//! A [`Workflow`] keeps three views of one file:
//!
//! - the raw text, which is the only thing ever written back to disk
//! - a typed summary ([`WorkflowContent`]) parsed with `serde_yaml`
//! - a positioned [`Node`] tree, built lazily and dropped on every mutation
//!
//! Mutations are textual and line-based so comments, blank lines and quoting
//! survive untouched.

pub mod tree;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fsutil;
use crate::version;

pub use tree::Node;

/// Default workflow directory, relative to the repository root
pub const DEFAULT_WORKFLOWS_DIR: &str = ".github/workflows";

/// The parts of a workflow the linters look at.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkflowContent {
    /// Workflow display name
    pub name: Option<String>,
    /// Raw trigger definition
    pub on: Option<Value>,
    /// Job bodies keyed by job ID, in document order
    pub jobs: IndexMap<String, Value>,
    /// Permissions block, absent when not declared
    pub permissions: Option<Value>,
}

impl WorkflowContent {
    fn parse(raw: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(raw)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value)
    }
}

/// An action usage found in a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionUse {
    /// The `uses` value, e.g. `actions/checkout@v4`
    pub uses: String,
    /// 1-based line of the value
    pub line: usize,
}

/// A GitHub Actions workflow file.
#[derive(Debug)]
pub struct Workflow {
    path: PathBuf,
    content: WorkflowContent,
    raw: String,
    tree: OnceCell<Option<Node>>,
}

impl Workflow {
    /// Read and parse a workflow file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::WorkflowRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_source(path, raw)
    }

    /// Build a workflow from text that claims to live at `path`.
    pub fn from_source(path: impl Into<PathBuf>, raw: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let raw = raw.into();
        let content = WorkflowContent::parse(&raw).map_err(|e| Error::WorkflowParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        debug!("Loaded workflow {} ({} jobs)", path.display(), content.jobs.len());
        Ok(Self {
            path,
            content,
            raw,
            tree: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, as shown in issues.
    pub fn base_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Typed summary of the current content.
    pub fn content(&self) -> &WorkflowContent {
        &self.content
    }

    /// Current raw text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Lines of the current raw text. A trailing newline yields a final empty line.
    pub fn lines(&self) -> std::str::Split<'_, char> {
        self.raw.split('\n')
    }

    pub fn has_permissions(&self) -> bool {
        self.content.permissions.is_some()
    }

    /// Replace the raw text and drop the structural tree.
    ///
    /// The summary is re-parsed; if the new text does not parse the previous
    /// summary is kept and the next structural query reports the error.
    pub fn set_raw(&mut self, raw: String) {
        if raw == self.raw {
            return;
        }
        match WorkflowContent::parse(&raw) {
            Ok(content) => self.content = content,
            Err(e) => warn!("{} no longer parses after edit: {}", self.base_name(), e),
        }
        self.raw = raw;
        self.tree = OnceCell::new();
    }

    /// Write the raw text back to the file.
    pub fn save(&self) -> Result<()> {
        fsutil::write_private(&self.path, self.raw.as_bytes()).map_err(|e| Error::WorkflowWrite {
            path: self.path.clone(),
            source: e,
        })?;
        debug!("Saved {}", self.path.display());
        Ok(())
    }

    /// The positioned tree, built on first use.
    pub fn tree(&self) -> Result<Option<&Node>> {
        let tree = self.tree.get_or_try_init(|| {
            Node::parse(&self.raw).map_err(|e| Error::StructuralParse {
                path: self.path.clone(),
                message: e.to_string(),
            })
        })?;
        Ok(tree.as_ref())
    }

    /// Every `uses:` scalar at any depth, in document order.
    pub fn find_action_references(&self) -> Result<Vec<ActionUse>> {
        let Some(root) = self.tree()? else {
            return Ok(Vec::new());
        };
        Ok(root
            .find_action_references()
            .into_iter()
            .map(|(uses, line)| ActionUse { uses, line })
            .collect())
    }

    /// Line of a job's key under `jobs:`, 0 when unknown.
    pub fn find_job_line(&self, job_id: &str) -> usize {
        self.job_node(job_id).map_or(0, |(key, _)| key.line())
    }

    /// Line where step `index` of a job starts, 0 when unknown.
    pub fn find_step_line(&self, job_id: &str, index: usize) -> usize {
        self.job_node(job_id)
            .and_then(|(_, job)| job.get("steps"))
            .and_then(|steps| steps.items().get(index))
            .map_or(0, Node::line)
    }

    fn job_node(&self, job_id: &str) -> Option<(&Node, &Node)> {
        self.tree()
            .ok()
            .flatten()?
            .get("jobs")?
            .entry(job_id)
    }

    /// Names of the top-level `env:` variables.
    pub fn workflow_env(&self) -> Vec<String> {
        let Ok(Some(root)) = self.tree() else {
            return Vec::new();
        };
        root.get("env")
            .map(|env| {
                env.entries()
                    .iter()
                    .filter_map(|(k, _)| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace `old` with `new` on every line where it appears as a whole
    /// reference, rewrite the trailing comment and save.
    ///
    /// Only the first occurrence per line is replaced. A match must not be
    /// followed or preceded by a reference character, so `@v3` never matches
    /// inside `@v3.1`.
    pub fn update_reference(&mut self, old: &str, new: &str, comment: Option<&str>) -> Result<()> {
        let mut updated = false;
        let lines: Vec<String> = self
            .lines()
            .map(|line| match find_reference(line, old) {
                Some(at) => {
                    updated = true;
                    let mut replaced = format!("{}{}{}", &line[..at], new, &line[at + old.len()..]);
                    if let Some(idx) = replaced.find(" #") {
                        replaced.truncate(idx);
                    }
                    let mut replaced = replaced.trim_end_matches([' ', '\t']).to_string();
                    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
                        replaced.push_str(" # ");
                        replaced.push_str(comment);
                    }
                    replaced
                }
                None => line.to_string(),
            })
            .collect();

        if !updated {
            return Err(Error::ReferenceNotFound(old.to_string()));
        }

        debug!("Updated {} -> {} in {}", old, new, self.base_name());
        self.set_raw(lines.join("\n"));
        self.save()
    }

    /// Put exactly one space before version-tag comments on `uses:` lines.
    ///
    /// Returns true if anything changed. Does not save.
    pub fn normalize_comment_spacing(&mut self) -> bool {
        let mut modified = false;
        let lines: Vec<String> = self
            .lines()
            .map(|line| {
                let normalized = normalize_uses_comment(line);
                if let Some(ref n) = normalized {
                    modified |= n != line;
                }
                normalized.unwrap_or_else(|| line.to_string())
            })
            .collect();

        if modified {
            self.set_raw(lines.join("\n"));
        }
        modified
    }
}

fn normalize_uses_comment(line: &str) -> Option<String> {
    if !line.contains("uses:") {
        return None;
    }
    let idx = line.find(" #")?;
    let comment = &line[idx + 1..];
    if !version::is_version_tag(comment[1..].trim()) {
        return None;
    }
    Some(format!("{} {}", line[..idx].trim_end_matches([' ', '\t']), comment))
}

fn is_reference_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '/' | '@')
}

/// Byte offset of the first whole-reference occurrence of `needle` in `line`.
fn find_reference(line: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    line.match_indices(needle).map(|(at, _)| at).find(|&at| {
        let before = line[..at].chars().next_back();
        let after = line[at + needle.len()..].chars().next();
        !before.is_some_and(is_reference_char) && !after.is_some_and(is_reference_char)
    })
}

/// Load every `.yml`/`.yaml` file directly inside `dir`, sorted by file name.
pub fn load_workflows(dir: impl AsRef<Path>) -> Result<Vec<Workflow>> {
    let dir = dir.as_ref();
    let mut workflows = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::Discovery {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() || !fsutil::is_yaml_file(entry.path()) {
            continue;
        }
        workflows.push(Workflow::load(entry.path())?);
    }
    debug!("Loaded {} workflows from {}", workflows.len(), dir.display());
    Ok(workflows)
}

/// Load a single workflow file, or every workflow in a directory.
pub fn discover(path: impl AsRef<Path>) -> Result<Vec<Workflow>> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(vec![Workflow::load(path)?]);
    }
    if path.is_dir() {
        return load_workflows(path);
    }
    Err(Error::Discovery {
        path: path.to_path_buf(),
        message: "no such file or directory".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CI: &str = "\
name: CI
on: [push]
env:
  GO_VERSION: '1.22'
  CGO_ENABLED: 0
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - name: Setup
        uses: actions/setup-go@v3.1   # pinned
  test:
    steps:
      - run: go test ./...
";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_summary() {
        let wf = Workflow::from_source("ci.yml", CI).unwrap();
        assert_eq!(wf.content().name.as_deref(), Some("CI"));
        assert_eq!(
            wf.content().jobs.keys().collect::<Vec<_>>(),
            vec!["build", "test"]
        );
        assert!(!wf.has_permissions());
        assert_eq!(wf.base_name(), "ci.yml");
    }

    #[test]
    fn test_load_empty_document() {
        let wf = Workflow::from_source("empty.yml", "").unwrap();
        assert_eq!(wf.content(), &WorkflowContent::default());
        assert!(wf.find_action_references().unwrap().is_empty());
    }

    #[test]
    fn test_load_malformed() {
        let err = Workflow::from_source("bad.yml", "jobs: [unclosed\n").unwrap_err();
        assert!(matches!(err, Error::WorkflowParse { .. }));
    }

    #[test]
    fn test_structural_queries() {
        let wf = Workflow::from_source("ci.yml", CI).unwrap();
        let refs = wf.find_action_references().unwrap();
        assert_eq!(
            refs,
            vec![
                ActionUse { uses: "actions/checkout@v3".into(), line: 10 },
                ActionUse { uses: "actions/setup-go@v3.1".into(), line: 12 },
            ]
        );
        assert_eq!(wf.find_job_line("build"), 7);
        assert_eq!(wf.find_job_line("test"), 13);
        assert_eq!(wf.find_job_line("missing"), 0);
        assert_eq!(wf.find_step_line("build", 1), 11);
        assert_eq!(wf.find_step_line("build", 5), 0);
        assert_eq!(wf.workflow_env(), vec!["GO_VERSION", "CGO_ENABLED"]);
    }

    #[test]
    fn test_update_reference_respects_boundaries() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ci.yml", CI);
        let mut wf = Workflow::load(&path).unwrap();

        let hash = "b4ffde65f46336ab88eb53be808477a3936bae11";
        wf.update_reference(
            "actions/setup-go@v3",
            &format!("actions/setup-go@{hash}"),
            Some("v3.5.0"),
        )
        .unwrap_err();

        wf.update_reference(
            "actions/checkout@v3",
            &format!("actions/checkout@{hash}"),
            Some("v3.5.0"),
        )
        .unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, wf.raw());
        assert!(saved.contains(&format!("      - uses: actions/checkout@{hash} # v3.5.0\n")));
        assert!(saved.contains("actions/setup-go@v3.1   # pinned"));
        assert_eq!(wf.find_action_references().unwrap()[0].uses, format!("actions/checkout@{hash}"));
    }

    #[test]
    fn test_update_reference_replaces_comment() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "ci.yml", "steps:\n  - uses: a/b@v1 # old note\n");
        let mut wf = Workflow::load(&path).unwrap();
        wf.update_reference("a/b@v1", "a/b@v2", None).unwrap();
        assert_eq!(wf.raw(), "steps:\n  - uses: a/b@v2\n");
    }

    #[test]
    fn test_update_reference_not_found() {
        let mut wf = Workflow::from_source("ci.yml", CI).unwrap();
        let err = wf.update_reference("actions/cache@v4", "x", None).unwrap_err();
        assert_eq!(err.to_string(), "action actions/cache@v4 not found");
    }

    #[test]
    fn test_normalize_comment_spacing() {
        let mut wf = Workflow::from_source(
            "ci.yml",
            "steps:\n  - uses: a/b@abc   # v1.2.0\n  - uses: c/d@v1   # keep me\n",
        )
        .unwrap();
        assert!(wf.normalize_comment_spacing());
        assert_eq!(
            wf.raw(),
            "steps:\n  - uses: a/b@abc # v1.2.0\n  - uses: c/d@v1   # keep me\n"
        );
        assert!(!wf.normalize_comment_spacing());
    }

    #[test]
    fn test_load_workflows_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write(&dir, "release.yaml", "name: Release\n");
        write(&dir, "ci.yml", "name: CI\n");
        write(&dir, "README.md", "# docs\n");
        std::fs::create_dir(dir.path().join("nested.yml")).unwrap();

        let workflows = load_workflows(dir.path()).unwrap();
        let names: Vec<String> = workflows.iter().map(Workflow::base_name).collect();
        assert_eq!(names, vec!["ci.yml", "release.yaml"]);
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "ci.yml", "name: CI\n");
        assert_eq!(discover(&file).unwrap().len(), 1);
        assert_eq!(discover(dir.path()).unwrap().len(), 1);
        assert!(matches!(
            discover(dir.path().join("missing")),
            Err(Error::Discovery { .. })
        ));
    }
}
