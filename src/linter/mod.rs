//! Workflow linting.
//!
//! Each check is a [`Linter`]: it reads a [`Workflow`] and reports
//! [`Issue`]s, and some can rewrite the workflow to fix what they report.
//! Linters are created by name through a [`LinterRegistry`], which lets the
//! configuration enable or disable them, and driven by the
//! [`WorkflowLinter`] orchestrator.
//!
//! | name          | checks                                         | fix |
//! |---------------|------------------------------------------------|-----|
//! | `versions`    | action refs that are not commit hashes         | yes |
//! | `permissions` | missing top-level `permissions`                | no  |
//! | `format`      | indentation, blank lines, whitespace, length   | yes |
//! | `secrets`     | hardcoded credentials                          | no  |
//! | `injection`   | untrusted expressions inside `run` scripts     | no  |
//! | `style`       | naming and step layout conventions             | no  |

pub mod format;
pub mod injection;
pub mod issue;
pub mod orchestrator;
pub mod permissions;
pub mod secrets;
pub mod style;
pub mod versions;

pub use format::FormatLinter;
pub use injection::InjectionLinter;
pub use issue::{classify_issues, Issue};
pub use orchestrator::{FixReport, WorkflowLinter};
pub use permissions::PermissionsLinter;
pub use secrets::SecretsLinter;
pub use style::StyleLinter;
pub use versions::VersionsLinter;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::actions::Resolver;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::workflow::Workflow;

pub const VERSIONS: &str = "versions";
pub const PERMISSIONS: &str = "permissions";
pub const FORMAT: &str = "format";
pub const SECRETS: &str = "secrets";
pub const INJECTION: &str = "injection";
pub const STYLE: &str = "style";

/// Every built-in linter, in the order they run.
pub const ALL_LINTERS: [&str; 6] = [VERSIONS, PERMISSIONS, FORMAT, SECRETS, INJECTION, STYLE];

const AUTO_FIX: [&str; 2] = [VERSIONS, FORMAT];

/// Returns true if the named linter can fix what it reports.
pub fn supports_auto_fix(name: &str) -> bool {
    AUTO_FIX.contains(&name)
}

/// A single workflow check.
#[async_trait]
pub trait Linter: Send + Sync {
    /// Check one workflow.
    async fn lint_workflow(&self, workflow: &Workflow) -> Result<Vec<Issue>>;

    /// Fix what this linter reports. Linters without a fix do nothing.
    async fn fix_workflow(&self, _workflow: &mut Workflow) -> Result<()> {
        Ok(())
    }
}

/// Everything a linter may need at construction.
#[derive(Clone)]
pub struct LinterContext {
    pub config: Arc<Config>,
    pub resolver: Arc<dyn Resolver>,
}

/// Creates a linter from the shared context.
pub type LinterFactory = fn(&LinterContext) -> Box<dyn Linter>;

/// Name to factory mapping; iteration follows registration order.
pub struct LinterRegistry {
    factories: IndexMap<&'static str, LinterFactory>,
}

impl LinterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// A registry holding every built-in linter.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(VERSIONS, |ctx| {
            Box::new(VersionsLinter::new(Arc::clone(&ctx.resolver)))
        });
        registry.register(PERMISSIONS, |_| Box::new(PermissionsLinter));
        registry.register(FORMAT, |ctx| {
            Box::new(FormatLinter::new(ctx.config.format_settings()))
        });
        registry.register(SECRETS, |_| Box::new(SecretsLinter));
        registry.register(INJECTION, |_| Box::new(InjectionLinter));
        registry.register(STYLE, |ctx| {
            Box::new(StyleLinter::new(ctx.config.style_settings()))
        });
        registry
    }

    /// Register or replace a linter.
    pub fn register(&mut self, name: &'static str, factory: LinterFactory) {
        self.factories.insert(name, factory);
    }

    /// Registered names in run order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Create one linter by name.
    pub fn create(&self, name: &str, ctx: &LinterContext) -> Result<Box<dyn Linter>> {
        self.factories
            .get(name)
            .map(|factory| factory(ctx))
            .ok_or_else(|| Error::UnknownLinter(name.to_string()))
    }

    /// Create every linter the configuration enables, in run order.
    pub fn create_enabled(&self, ctx: &LinterContext) -> Vec<(&'static str, Box<dyn Linter>)> {
        self.factories
            .iter()
            .filter(|(name, _)| ctx.config.is_linter_enabled(name))
            .map(|(name, factory)| (*name, factory(ctx)))
            .collect()
    }
}

impl Default for LinterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::MockResolver;

    fn context(config: Config) -> LinterContext {
        LinterContext {
            config: Arc::new(config),
            resolver: Arc::new(MockResolver::new()),
        }
    }

    #[test]
    fn test_builtin_order() {
        let registry = LinterRegistry::with_builtins();
        assert_eq!(registry.names().collect::<Vec<_>>(), ALL_LINTERS.to_vec());
    }

    #[test]
    fn test_supports_auto_fix() {
        assert!(supports_auto_fix("versions"));
        assert!(supports_auto_fix("format"));
        assert!(!supports_auto_fix("permissions"));
        assert!(!supports_auto_fix("style"));
        assert!(!supports_auto_fix("unknown"));
    }

    #[test]
    fn test_create_enabled_follows_config() {
        let registry = LinterRegistry::with_builtins();

        let config = Config::from_yaml("linters:\n  default: none\n  enable: [style, format]\n").unwrap();
        let names: Vec<_> = registry
            .create_enabled(&context(config))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["format", "style"]);

        let config = Config::from_yaml("linters:\n  disable: [versions]\n").unwrap();
        let names: Vec<_> = registry
            .create_enabled(&context(config))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["permissions", "format", "secrets", "injection", "style"]);
    }

    #[test]
    fn test_create_unknown() {
        let registry = LinterRegistry::with_builtins();
        assert!(matches!(
            registry.create("security", &context(Config::default())),
            Err(Error::UnknownLinter(_))
        ));
        assert!(registry.create("format", &context(Config::default())).is_ok());
    }
}
