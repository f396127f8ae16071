//! Output formatting module

mod github;
mod json;
mod text;

use std::path::Path;

use deltalint_core::LintReport;
use miette::Result;

use crate::cli::OutputFormat;

/// Prints `report` to stdout. Paths are shown relative to `base`.
pub fn output_report(report: &LintReport, format: OutputFormat, base: &Path) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_json(report)?,
        OutputFormat::Github => github::output_github(report, base),
        OutputFormat::Text => text::output_text(report, base),
    }
    Ok(())
}
