//! JSON output formatter

use deltalint_core::LintReport;
use miette::{IntoDiagnostic, Result};

pub fn output_json(report: &LintReport) -> Result<()> {
    println!("{}", report.to_json().into_diagnostic()?);
    Ok(())
}
