//! Parsing of the external tool's diagnostic output.
//!
//! The tool prints one diagnostic per line in the MSBuild canonical form:
//!
//! ```text
//! <file>(<line>,<column>): <severity> <ruleId>: <message> [<manifest>]
//! ```
//!
//! Lines that do not have this shape are ignored. The `<file>` token may be
//! relative to some directory the tool chose, so it is reconciled back to one
//! of the batch's input paths by suffix matching.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{BatchOutcome, Finding, Severity};

/// Source tag of findings produced from tool output.
pub const TOOL_SOURCE: &str = "dotnet-format";

static DIAGNOSTIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<file>.+?)\((?P<line>\d+),(?P<column>\d+)\):\s*(?P<severity>(?i:info|warning|error))\s+(?P<rule>[A-Za-z][A-Za-z0-9_]*)\s*:\s*(?P<message>.*)$",
    )
    .expect("valid diagnostic pattern")
});

static MANIFEST_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\[[^\[\]]*\.csproj\]\s*$").expect("valid manifest suffix pattern")
});

/// One parsed diagnostic line, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDiagnostic {
    pub file_token: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub rule_id: String,
    pub message: String,
}

/// Parses a single output line.
pub fn parse_line(line: &str) -> Option<ToolDiagnostic> {
    let caps = DIAGNOSTIC_LINE.captures(line)?;
    let message = MANIFEST_SUFFIX.replace(&caps["message"], "");

    Some(ToolDiagnostic {
        file_token: caps["file"].trim().to_string(),
        line: caps["line"].parse().ok()?,
        column: caps["column"].parse().ok()?,
        severity: Severity::parse_lenient(&caps["severity"]),
        rule_id: caps["rule"].to_string(),
        message: message.trim().to_string(),
    })
}

/// Result of mapping a file token to the batch's input paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled<'a> {
    /// Exactly one input path matches.
    Unique(&'a Path),
    /// No input path matches.
    Unresolved,
    /// More than one input path matches.
    Ambiguous,
}

/// Maps `token` to the one input path it refers to.
///
/// A path matches when it equals the token or ends with it at a path
/// component boundary. Comparison ignores case and treats `\` as `/`.
pub fn reconcile_path<'a>(token: &str, files: &'a [PathBuf]) -> Reconciled<'a> {
    let token = normalize(token);
    let token = token.trim_start_matches("./");
    if token.is_empty() {
        return Reconciled::Unresolved;
    }

    let mut found = None;
    for file in files {
        let candidate = normalize(&file.to_string_lossy());
        if !matches_suffix(&candidate, token) {
            continue;
        }
        if found.is_some() {
            return Reconciled::Ambiguous;
        }
        found = Some(file.as_path());
    }

    found.map_or(Reconciled::Unresolved, Reconciled::Unique)
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

fn matches_suffix(candidate: &str, token: &str) -> bool {
    if candidate == token {
        return true;
    }
    candidate.ends_with(token)
        && (token.starts_with('/') || candidate[..candidate.len() - token.len()].ends_with('/'))
}

/// Turns raw tool output into findings for the requested rules.
///
/// Diagnostics for other rule ids are dropped. Diagnostics whose file cannot
/// be reconciled to exactly one of `files` are dropped and counted.
pub fn parse_tool_output(text: &str, requested: &[String], files: &[PathBuf]) -> BatchOutcome {
    let requested: HashSet<&str> = requested.iter().map(String::as_str).collect();
    let mut outcome = BatchOutcome::default();

    for line in text.lines() {
        let Some(diag) = parse_line(line) else {
            continue;
        };
        if !requested.contains(diag.rule_id.as_str()) {
            outcome.stats.unrequested_rule += 1;
            continue;
        }

        match reconcile_path(&diag.file_token, files) {
            Reconciled::Unique(path) => outcome.findings.push(
                Finding::new(diag.rule_id, path, diag.message, TOOL_SOURCE)
                    .at(diag.line, Some(diag.column))
                    .with_severity(diag.severity),
            ),
            Reconciled::Unresolved => {
                debug!("No input file matches '{}'; dropping finding", diag.file_token);
                outcome.stats.unresolved_path += 1;
            }
            Reconciled::Ambiguous => {
                debug!(
                    "Several input files match '{}'; dropping finding",
                    diag.file_token
                );
                outcome.stats.ambiguous_path += 1;
            }
        }
    }

    outcome
}
