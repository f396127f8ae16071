//! GitHub Actions annotation formatter

use std::path::Path;

use deltalint_core::LintReport;

pub fn output_github(report: &LintReport, base: &Path) {
    for line in report.github_annotations(Some(base)) {
        println!("{}", line);
    }
}
