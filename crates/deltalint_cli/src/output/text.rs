//! Text output formatter

use std::path::Path;

use deltalint_core::{LintReport, Severity};

pub fn output_text(report: &LintReport, base: &Path) {
    for (path, findings) in report.group_by_file() {
        let shown = path.strip_prefix(base).unwrap_or(path);
        println!("\n{}:", shown.display());
        for finding in findings {
            let location = match (finding.line, finding.column) {
                (0, _) => "File".to_string(),
                (line, Some(col)) => format!("Line {}:{}", line, col),
                (line, None) => format!("Line {}", line),
            };
            println!(
                "  {} {} [{}]: {}",
                location, finding.severity, finding.rule_id, finding.message
            );
        }
    }

    let counts = report.count_by_severity();
    let count = |severity: Severity| counts.get(&severity).copied().unwrap_or(0);

    println!();
    if report.findings.is_empty() {
        println!("No issues found");
    } else {
        println!(
            "{} errors, {} warnings, {} suggestions",
            count(Severity::Error),
            count(Severity::Warning),
            count(Severity::Info) + count(Severity::Suggestion)
        );
    }
    println!(
        "Checked {} files in {:.2}s",
        report.files_checked,
        report.execution_time.as_secs_f64()
    );

    let stats = &report.stats;
    if stats.unreconciled() > 0 {
        println!(
            "{} finding(s) could not be matched to a changed file",
            stats.unreconciled()
        );
    }
    if stats.unknown_rule > 0 {
        println!(
            "{} rule check(s) skipped: no in-process implementation",
            stats.unknown_rule
        );
    }
    if stats.failed_pairs > 0 {
        println!("{} rule check(s) failed to run", stats.failed_pairs);
    }
}
