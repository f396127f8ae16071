//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use deltalint_core::GitMode;

/// deltalint - Incremental linter for changed files
#[derive(Parser)]
#[command(name = "deltalint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint the files changed in a git repository
    Lint {
        /// Repository to read changes from
        #[arg(long)]
        repo: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the configured change-set mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Skip the format tool availability check
        #[arg(long)]
        skip_tool_check: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    /// GitHub Actions workflow commands
    Github,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Staged,
    Commit,
}

impl From<ModeArg> for GitMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Staged => GitMode::Staged,
            ModeArg::Commit => GitMode::Commit,
        }
    }
}
