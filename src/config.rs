//! Configuration module for github-ci
//!
//! Settings live in a single YAML file (`.github-ci.yaml` by default) with
//! three sections:
//! - `run`: timeout for remote lookups and the exit code used when issues remain
//! - `linters`: enable/disable policy plus per-linter settings
//! - `upgrade`: output format and per-action version constraints
//!
//! Every field is optional. A missing file yields the defaults; an invalid
//! value is rejected before any linting starts.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fsutil;
use crate::linter::ALL_LINTERS;
use crate::version;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".github-ci.yaml";

/// Default bound on all remote lookups of one invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default exit code when issues are found
pub const DEFAULT_ISSUES_EXIT_CODE: i32 = 1;

/// Version constraint applied to actions without an explicit entry
pub const DEFAULT_VERSION_PATTERN: &str = "^1.0.0";

const LINTERS_ALL: &str = "all";
const LINTERS_NONE: &str = "none";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runtime settings
    pub run: RunConfig,

    /// Linter selection and settings
    pub linters: LinterConfig,

    /// Upgrade settings
    pub upgrade: UpgradeConfig,
}

/// Runtime settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Timeout for all network operations (e.g. `30s`, `2m`)
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Exit code used when issues are found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues_exit_code: Option<i32>,
}

/// Which linters run. `disable` always wins over `enable`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    /// `all` runs everything not disabled; `none` runs only what is enabled
    pub default: String,

    /// Linters to enable
    pub enable: Vec<String>,

    /// Linters to disable
    pub disable: Vec<String>,

    /// Per-linter settings
    #[serde(skip_serializing_if = "LinterSettings::is_empty")]
    pub settings: LinterSettings,
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self {
            default: LINTERS_ALL.to_string(),
            enable: Vec::new(),
            disable: Vec::new(),
            settings: LinterSettings::default(),
        }
    }
}

/// Per-linter settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleSettings>,
}

impl LinterSettings {
    fn is_empty(&self) -> bool {
        self.format.is_none() && self.style.is_none()
    }
}

/// Settings for the format linter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FormatSettings {
    /// Spaces per indentation level
    pub indent_width: usize,

    /// Maximum line length in characters; 0 disables the check
    pub max_line_length: usize,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            indent_width: 2,
            max_line_length: 120,
        }
    }
}

/// Settings for the style linter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StyleSettings {
    /// Minimum characters in a name; 0 disables the check
    pub min_name_length: usize,

    /// Maximum characters in a name; 0 disables the check
    pub max_name_length: usize,

    /// `title`, `sentence`, or empty for no convention
    pub naming_convention: String,

    /// Flag `actions/checkout` steps that are not the first step
    pub checkout_first: bool,

    /// Flag steps without a `name`
    pub require_step_names: bool,

    /// Maximum lines in a `run` script; 0 disables the check
    pub max_run_lines: usize,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            min_name_length: 3,
            max_name_length: 50,
            naming_convention: String::new(),
            checkout_first: false,
            require_step_names: false,
            max_run_lines: 0,
        }
    }
}

/// Settings for the upgrade command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Reference format written by upgrades: `tag`, `hash` or `major`
    pub version: String,

    /// Version constraints keyed by action name (`owner/repo[/path]`)
    pub actions: IndexMap<String, ActionConfig>,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            version: VersionFormat::Tag.to_string(),
            actions: IndexMap::new(),
        }
    }
}

/// Version constraint for one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// `^X.0.0`, `~X.Y.0`, or empty for the absolute latest
    #[serde(default)]
    pub version: String,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION_PATTERN.to_string(),
        }
    }
}

/// How upgraded references are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionFormat {
    /// `@v4.1.7`
    #[default]
    Tag,
    /// `@<sha> # v4.1.7`
    Hash,
    /// `@v4`
    Major,
}

impl VersionFormat {
    /// All accepted spellings, in documentation order.
    pub const VARIANTS: [&'static str; 3] = ["tag", "hash", "major"];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionFormat::Tag => "tag",
            VersionFormat::Hash => "hash",
            VersionFormat::Major => "major",
        }
    }
}

impl fmt::Display for VersionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tag" => Ok(VersionFormat::Tag),
            "hash" => Ok(VersionFormat::Hash),
            "major" => Ok(VersionFormat::Major),
            other => Err(Error::config_validation(format!(
                "upgrade.version must be one of [{}], got \"{}\"",
                Self::VARIANTS.join(", "),
                other
            ))),
        }
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults. An empty or comment-only file is
    /// treated the same way.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            Error::ConfigParse { message, .. } => Error::ConfigParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let parse_error = |e: serde_yaml::Error| Error::ConfigParse {
            path: DEFAULT_CONFIG_FILE.into(),
            message: e.to_string(),
        };

        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_error)?;
        let config = if value.is_null() {
            Config::default()
        } else {
            serde_yaml::from_value(value).map_err(parse_error)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as YAML with owner-only permissions.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fsutil::write_private(path, yaml.as_bytes()).map_err(|e| Error::ConfigWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// A configuration with every option spelled out at its default.
    pub fn full_default() -> Self {
        Config {
            run: RunConfig {
                timeout: Some(DEFAULT_TIMEOUT),
                issues_exit_code: Some(DEFAULT_ISSUES_EXIT_CODE),
            },
            linters: LinterConfig {
                enable: ALL_LINTERS.iter().map(|s| s.to_string()).collect(),
                settings: LinterSettings {
                    format: Some(FormatSettings::default()),
                    style: Some(StyleSettings::default()),
                },
                ..LinterConfig::default()
            },
            upgrade: UpgradeConfig::default(),
        }
    }

    /// Check every value, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        if let Some(code) = self.run.issues_exit_code {
            if !(1..=255).contains(&code) {
                return Err(Error::config_validation(format!(
                    "issues-exit-code must be between 1 and 255, got {code}"
                )));
            }
        }

        let linters = &self.linters;
        if !linters.default.is_empty()
            && linters.default != LINTERS_ALL
            && linters.default != LINTERS_NONE
        {
            return Err(Error::config_validation(format!(
                "linters.default must be \"all\" or \"none\", got \"{}\"",
                linters.default
            )));
        }
        for (list, names) in [("enable", &linters.enable), ("disable", &linters.disable)] {
            if let Some(unknown) = names.iter().find(|n| !ALL_LINTERS.contains(&n.as_str())) {
                return Err(Error::config_validation(format!(
                    "unknown linter \"{unknown}\" in linters.{list}"
                )));
            }
        }

        if let Some(ref format) = linters.settings.format {
            if format.indent_width == 0 {
                return Err(Error::config_validation(
                    "linters.settings.format.indent-width must be at least 1",
                ));
            }
        }
        if let Some(ref style) = linters.settings.style {
            if !matches!(style.naming_convention.as_str(), "" | "title" | "sentence") {
                return Err(Error::config_validation(format!(
                    "linters.settings.style.naming-convention must be \"title\", \"sentence\" or empty, got \"{}\"",
                    style.naming_convention
                )));
            }
            if style.min_name_length > 0
                && style.max_name_length > 0
                && style.min_name_length > style.max_name_length
            {
                return Err(Error::config_validation(format!(
                    "linters.settings.style.min-name-length ({}) exceeds max-name-length ({})",
                    style.min_name_length, style.max_name_length
                )));
            }
        }

        if !self.upgrade.version.is_empty() {
            self.upgrade.version.parse::<VersionFormat>()?;
        }

        Ok(())
    }

    /// Bound on all remote lookups of one invocation.
    pub fn timeout(&self) -> Duration {
        self.run.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Exit code used when issues remain.
    pub fn issues_exit_code(&self) -> i32 {
        self.run
            .issues_exit_code
            .filter(|code| (1..=255).contains(code))
            .unwrap_or(DEFAULT_ISSUES_EXIT_CODE)
    }

    /// Returns true if the named linter should run.
    pub fn is_linter_enabled(&self, name: &str) -> bool {
        let linters = &self.linters;
        if linters.disable.iter().any(|n| n == name) {
            return false;
        }
        if linters.default.is_empty() || linters.default == LINTERS_ALL {
            return true;
        }
        linters.enable.iter().any(|n| n == name)
    }

    /// Format linter settings, defaulted when absent.
    pub fn format_settings(&self) -> FormatSettings {
        self.linters.settings.format.clone().unwrap_or_default()
    }

    /// Style linter settings, defaulted when absent.
    pub fn style_settings(&self) -> StyleSettings {
        self.linters.settings.style.clone().unwrap_or_default()
    }

    /// Upgrade constraint for an action, `^1.0.0` when not configured.
    pub fn action_config(&self, name: &str) -> ActionConfig {
        self.upgrade.actions.get(name).cloned().unwrap_or_default()
    }

    /// Set the upgrade constraint for an action.
    pub fn set_action_config(&mut self, name: impl Into<String>, config: ActionConfig) {
        self.upgrade.actions.insert(name.into(), config);
    }

    /// Reference format written by upgrades.
    pub fn version_format(&self) -> VersionFormat {
        self.upgrade.version.parse().unwrap_or_default()
    }
}

/// Returns true if `new` is newer than `current` and allowed by `pattern`.
pub fn should_update(current: &str, new: &str, pattern: &str) -> bool {
    version::compare(new, current).is_gt() && version::matches_pattern(new, pattern)
}

/// The action name of a `uses` value: everything before the first `@`.
pub fn normalize_action_name(uses: &str) -> &str {
    uses.split_once('@').map_or(uses, |(name, _)| name)
}
