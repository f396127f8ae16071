//! deltalint CLI
//!
//! Lints only the files a change touched.

mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::init::run_init;
use crate::commands::lint::{LintArgs, run_lint};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    match &cli.command {
        Commands::Lint {
            repo,
            format,
            output,
            mode,
            skip_tool_check,
        } => run_lint(
            &cli,
            &LintArgs {
                repo,
                format: *format,
                output: output.as_deref(),
                mode: *mode,
                skip_tool_check: *skip_tool_check,
            },
        ),
        Commands::Init { force } => run_init(*force).map(|_| false),
    }
}
