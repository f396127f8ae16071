//! Run report and aggregation.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::analyzer::{AnalyzerKind, BatchStats};
use crate::{Finding, LinterError, Severity};

/// An analyzer group that failed as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupFailure {
    pub group: AnalyzerKind,
    pub message: String,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LintReport {
    /// Findings in emission order: format group first, then custom.
    #[serde(rename = "results")]
    pub findings: Vec<Finding>,
    pub executed_at: DateTime<Utc>,
    #[serde(rename = "executionTimeSeconds", serialize_with = "as_seconds")]
    pub execution_time: Duration,
    /// Distinct non-deleted target files in the change set.
    pub files_checked: usize,
    #[serde(skip_serializing_if = "BatchStats::is_clean")]
    pub stats: BatchStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<GroupFailure>,
}

fn as_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl LintReport {
    /// An empty report stamped with the current time.
    pub fn new() -> Self {
        Self {
            findings: Vec::new(),
            executed_at: Utc::now(),
            execution_time: Duration::ZERO,
            files_checked: 0,
            stats: BatchStats::default(),
            failures: Vec::new(),
        }
    }

    pub fn group_by_file(&self) -> BTreeMap<&Path, Vec<&Finding>> {
        group_by_file(&self.findings)
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        count_by_severity(&self.findings)
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.findings)
    }

    pub fn has_warnings(&self) -> bool {
        has_warnings(&self.findings)
    }

    /// 1 when any finding is an error, else 0.
    pub fn exit_code(&self) -> u8 {
        exit_code(&self.findings)
    }

    pub fn to_json(&self) -> Result<String, LinterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report as pretty JSON to `path`.
    pub fn save_json(&self, path: &Path) -> Result<(), LinterError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// GitHub Actions workflow commands, one per finding.
    pub fn github_annotations(&self, base: Option<&Path>) -> Vec<String> {
        render_annotations(&self.findings, base)
    }
}

impl Default for LintReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Findings keyed by file, each list ordered by line. Findings on the same
/// line keep the order they were produced in.
pub fn group_by_file(findings: &[Finding]) -> BTreeMap<&Path, Vec<&Finding>> {
    let mut groups: BTreeMap<&Path, Vec<&Finding>> = BTreeMap::new();
    for finding in findings {
        groups
            .entry(finding.file_path.as_path())
            .or_default()
            .push(finding);
    }
    for list in groups.values_mut() {
        list.sort_by_key(|finding| finding.line);
    }
    groups
}

pub fn count_by_severity(findings: &[Finding]) -> BTreeMap<Severity, usize> {
    let mut counts = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }
    counts
}

pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}

pub fn has_warnings(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Warning)
}

pub fn exit_code(findings: &[Finding]) -> u8 {
    if has_errors(findings) { 1 } else { 0 }
}

fn render_annotations(findings: &[Finding], base: Option<&Path>) -> Vec<String> {
    findings
        .iter()
        .map(|f| {
            let level = match f.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info | Severity::Suggestion | Severity::None => "notice",
            };
            let path = match base {
                Some(base) => f.relative_path(base),
                None => f.file_path.clone(),
            };
            let path = path.to_string_lossy().replace('\\', "/");
            let location = match (f.line, f.column) {
                (0, _) => format!("file={}", path),
                (line, Some(col)) => format!("file={},line={},col={}", path, line, col),
                (line, None) => format!("file={},line={}", path, line),
            };
            format!("::{} {}::[{}] {}", level, location, f.rule_id, f.message)
        })
        .collect()
}
