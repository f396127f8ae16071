//! Lint command implementation

use std::path::{Path, PathBuf};

use deltalint_core::{GitChangeSet, LintEngine, LinterConfig};
use miette::{IntoDiagnostic, Result};
use tracing::info;

use crate::cli::{Cli, ModeArg, OutputFormat};
use crate::output::output_report;

pub struct LintArgs<'a> {
    pub repo: &'a Path,
    pub format: OutputFormat,
    pub output: Option<&'a Path>,
    pub mode: Option<ModeArg>,
    pub skip_tool_check: bool,
}

pub fn run_lint(cli: &Cli, args: &LintArgs<'_>) -> Result<bool> {
    let mut config = if let Some(ref path) = cli.config {
        LinterConfig::from_file(path).into_diagnostic()?
    } else {
        find_config(args.repo)?
    };
    if let Some(mode) = args.mode {
        config.git_mode = mode.into();
    }

    let provider = GitChangeSet::new(args.repo, config.git_mode);
    let engine = LintEngine::new(config).into_diagnostic()?;

    if !args.skip_tool_check {
        engine.preflight().map_err(|e| {
            miette::miette!(
                help = "Install the .NET SDK (which ships `dotnet format`) or disable analyzers.format",
                "{}",
                e
            )
        })?;
    }

    let report = engine.execute(&provider).into_diagnostic()?;

    let base = repo_root(args.repo);
    output_report(&report, args.format, &base)?;

    if let Some(path) = args.output {
        report.save_json(path).into_diagnostic()?;
        info!("Report written to {}", path.display());
    }

    if !report.failures.is_empty() {
        for failure in &report.failures {
            eprintln!("  {} analyzer: {}", failure.group, failure.message);
        }
        return Err(miette::miette!(
            "{} analyzer group(s) failed",
            report.failures.len()
        ));
    }

    Ok(report.has_errors())
}

pub fn find_config(repo: &Path) -> Result<LinterConfig> {
    if let Some(path) = LinterConfig::discover(repo) {
        info!("Using config: {}", path.display());
        return LinterConfig::from_file(&path).into_diagnostic();
    }

    info!("No config file found, using defaults");
    Ok(LinterConfig::new())
}

fn repo_root(repo: &Path) -> PathBuf {
    std::fs::canonicalize(repo).unwrap_or_else(|_| repo.to_path_buf())
}
