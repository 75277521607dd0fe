//! CLI module for github-ci
//!
//! This module provides the command-line interface: argument parsing and
//! subcommand dispatch.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use github_ci::config::DEFAULT_CONFIG_FILE;

/// github-ci - lint and upgrade GitHub Actions workflows
#[derive(Parser, Debug, Clone)]
#[command(name = "github-ci")]
#[command(version)]
#[command(about = "Lint and upgrade GitHub Actions workflows", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    /// Path to configuration file
    #[arg(
        short = 'c',
        long,
        global = true,
        env = "GITHUB_CI_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Lint workflow files
    Lint(commands::lint::LintArgs),

    /// Upgrade actions to their latest allowed versions
    Upgrade(commands::upgrade::UpgradeArgs),

    /// Write a configuration file with every option spelled out
    Init(commands::init::InitArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-4)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(4)
    }

    /// Check if JSON output is requested
    pub fn is_json(&self) -> bool {
        matches!(self.output, OutputFormat::Json)
    }
}
