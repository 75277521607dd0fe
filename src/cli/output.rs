//! Output formatting for the github-ci CLI
//!
//! Human output goes to stdout and is plain text unless colors are enabled;
//! diagnostics go to stderr. In JSON mode each command emits one document.

use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};

use github_ci::actions::CacheStats;
use github_ci::linter::Issue;

/// Output formatter for the human and JSON modes
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// JSON output mode
    json_mode: bool,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();

        Self {
            use_color,
            json_mode,
            verbosity,
        }
    }

    /// Returns true when commands should emit a JSON document
    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a section heading such as `Issues:`
    pub fn section(&self, title: &str, success: bool) {
        if self.json_mode {
            return;
        }

        let heading = format!("{title}:");
        if !self.use_color {
            println!("{heading}");
        } else if success {
            println!("{}", heading.green().bold());
        } else {
            println!("{}", heading.yellow().bold());
        }
    }

    /// Print one issue, indented under its section
    pub fn issue(&self, issue: &Issue) {
        if self.json_mode {
            return;
        }

        if self.use_color && issue.line > 0 {
            let location = format!("{}:{}:", issue.file, issue.line);
            println!(
                "  {} {} {}",
                location.bold(),
                format!("({})", issue.linter).cyan(),
                issue.message
            );
        } else {
            println!("  {issue}");
        }
    }

    /// Print a summary line such as `3 issue(s).`
    pub fn summary(&self, message: &str, clean: bool) {
        if self.json_mode {
            return;
        }

        if !self.use_color {
            println!("{message}");
        } else if clean {
            println!("{}", message.green().bold());
        } else {
            println!("{}", message.red().bold());
        }
    }

    /// Print resolver cache counters
    pub fn cache_stats(&self, stats: &CacheStats) {
        if self.json_mode {
            return;
        }

        println!("Cache: {} hits, {} misses", stats.hits, stats.misses);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.json_mode {
            self.emit_stderr("error", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.json_mode {
            self.emit_stderr("warning", message);
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print a hint
    pub fn hint(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("{}", message.cyan());
        } else {
            println!("{}", message);
        }
    }

    /// Print an info message (shown with -v)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 || self.json_mode {
            return;
        }

        if self.use_color {
            eprintln!("{} {}", "INFO:".blue(), message);
        } else {
            eprintln!("INFO: {}", message);
        }
    }

    /// Print plan output: plain text, no prefix
    pub fn plan(&self, message: &str) {
        if self.json_mode {
            return;
        }

        println!("{}", message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.json_mode {
            return;
        }

        if self.use_color {
            println!("{} {}", "✓".green().bold(), message);
        } else {
            println!("✓ {}", message);
        }
    }

    /// Emit a JSON document on stdout
    pub fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn emit_stderr(&self, kind: &str, message: &str) {
        let value = serde_json::json!({
            "type": kind,
            "message": message
        });
        eprintln!("{}", value);
    }

    /// Flush stdout
    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}
