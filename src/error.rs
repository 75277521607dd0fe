//! Error types for github-ci.
//!
//! Library operations return [`Result<T>`]. Remote lookups have their own
//! [`ResolveError`](crate::actions::ResolveError) which converts into [`Error`]
//! so resolver failures propagate through linters with `?`.

use std::path::PathBuf;
use thiserror::Error;

use crate::actions::ResolveError;

/// Result type alias for github-ci operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for github-ci.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Workflow Errors
    // ========================================================================
    /// A workflow file could not be read.
    #[error("failed to read workflow '{path}': {source}")]
    WorkflowRead {
        /// Path to the workflow file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A workflow file is not valid YAML.
    #[error("failed to parse workflow '{path}': {message}")]
    WorkflowParse {
        /// Path to the workflow file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The positioned structural tree could not be built.
    #[error("failed to build structure of '{path}': {message}")]
    StructuralParse {
        /// Path to the workflow file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A workflow file could not be written back.
    #[error("failed to write workflow '{path}': {source}")]
    WorkflowWrite {
        /// Path to the workflow file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Workflow discovery failed.
    #[error("failed to load workflows from '{path}': {message}")]
    Discovery {
        /// Directory or file that was scanned
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A textual reference update did not match any line.
    #[error("action {0} not found")]
    ReferenceNotFound(String),

    // ========================================================================
    // Action Reference Errors
    // ========================================================================
    /// A `uses` value without the `owner/repo@ref` shape.
    #[error("invalid action format: {0}")]
    InvalidActionFormat(String),

    /// A `uses` value whose path part has no repository.
    #[error("invalid action path: {0}")]
    InvalidActionPath(String),

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// A remote lookup failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Resolving a reference during a fix failed.
    #[error("failed to get commit hash for {uses}: {source}")]
    CommitResolution {
        /// The `uses` value being pinned
        uses: String,
        /// Resolver failure
        #[source]
        source: ResolveError,
    },

    /// Rewriting a resolved reference into a workflow failed.
    #[error("failed to update action in {file}: {source}")]
    UpdateFailed {
        /// Workflow path
        file: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    ConfigRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the config schema.
    #[error("failed to parse config file '{path}': {message}")]
    ConfigParse {
        /// Path to the config file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// A configuration value is out of range or unknown.
    #[error("invalid config: {0}")]
    ConfigValidation(String),

    /// The configuration file could not be written.
    #[error("failed to write config file '{path}': {message}")]
    ConfigWrite {
        /// Path to the config file
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Linter Errors
    // ========================================================================
    /// A linter failed while checking a workflow.
    #[error("linter {linter} failed on {file}: {source}")]
    LinterFailed {
        /// Registered linter name
        linter: String,
        /// Workflow file name
        file: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A linter failed while fixing a workflow.
    #[error("linter {linter} fix failed on {file}: {source}")]
    FixFailed {
        /// Registered linter name
        linter: String,
        /// Workflow file name
        file: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// A linter name that is not in the registry.
    #[error("unknown linter '{0}'")]
    UnknownLinter(String),
}

impl Error {
    /// Create a config validation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Wrap a lint-time failure with the linter and file it happened in.
    pub fn linter_failed(linter: impl Into<String>, file: impl Into<String>, source: Error) -> Self {
        Self::LinterFailed {
            linter: linter.into(),
            file: file.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a fix-time failure with the linter and file it happened in.
    pub fn fix_failed(linter: impl Into<String>, file: impl Into<String>, source: Error) -> Self {
        Self::FixFailed {
            linter: linter.into(),
            file: file.into(),
            source: Box::new(source),
        }
    }

    /// Returns true if the root cause is a cancelled remote call.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Resolve(e) | Self::CommitResolution { source: e, .. } => e.is_cancelled(),
            Self::UpdateFailed { source, .. }
            | Self::LinterFailed { source, .. }
            | Self::FixFailed { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
