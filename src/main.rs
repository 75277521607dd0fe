//! github-ci - lint and upgrade GitHub Actions workflows
//!
//! This is the main entry point for the github-ci CLI.

mod cli;

use anyhow::Result;
use cli::commands::{CommandContext, Runnable};
use cli::{Cli, Commands};
use colored::Colorize;
use github_ci::config::Config;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            let use_color = !cli.no_color && std::env::var("NO_COLOR").is_err();
            if use_color {
                eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
            } else {
                eprintln!("✗ Error: {:#}", e);
            }
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    // Load configuration; an invalid file stops the run before any linting,
    // except for init which is how it gets replaced
    let config = match (&cli.command, Config::load(&cli.config)) {
        (_, Ok(config)) => config,
        (Commands::Init(_), Err(e)) => {
            warn!("Ignoring unreadable config: {}", e);
            Config::default()
        }
        (_, Err(e)) => return Err(e.into()),
    };
    let timeout = config.timeout();

    let mut ctx = CommandContext::new(cli, config);
    ctx.start_deadline(timeout);

    match &cli.command {
        Commands::Lint(args) => args.run(&mut ctx).await,
        Commands::Upgrade(args) => args.run(&mut ctx).await,
        Commands::Init(args) => args.run(&mut ctx).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}
