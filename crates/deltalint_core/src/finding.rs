//! Finding types produced by analyzers.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// Severity level for findings and catalog rules.
///
/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Disabled; a catalog rule with this severity never runs.
    None,
    /// Suggestion.
    Suggestion,
    /// Informational message.
    Info,
    /// Should be reviewed.
    #[default]
    Warning,
    /// Must be fixed. Fails the run.
    Error,
}

impl Severity {
    /// Parses free text into a severity.
    ///
    /// Matching is case-insensitive. Anything unrecognised maps to
    /// [`Severity::Warning`].
    pub fn parse_lenient(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "suggestion" => Self::Suggestion,
            "info" => Self::Info,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Warning,
        }
    }

    /// Lowercase keyword for this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Suggestion => "suggestion",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse_lenient(&text))
    }
}

/// A single reported diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// The rule that produced this finding.
    pub rule_id: String,

    /// Absolute path of the offending file.
    pub file_path: PathBuf,

    /// 1-based line, `0` for file-level findings.
    pub line: u32,

    /// 1-based column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,

    /// Human readable message.
    pub message: String,

    /// Severity level.
    #[serde(default)]
    pub severity: Severity,

    /// Tag of the analyzer that produced this finding.
    pub source: String,
}

impl Finding {
    /// Creates a file-level warning.
    pub fn new(
        rule_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            file_path: file_path.into(),
            line: 0,
            column: None,
            message: message.into(),
            severity: Severity::Warning,
            source: source.into(),
        }
    }

    /// Sets the line and column.
    pub fn at(mut self, line: u32, column: Option<u32>) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Sets the severity level.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Path of the file relative to `base`, falling back to the absolute path.
    pub fn relative_path(&self, base: &Path) -> PathBuf {
        self.file_path
            .strip_prefix(base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.file_path.clone())
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.column {
            Some(column) => write!(
                f,
                "{} [{}] Line {}, Col {}: {}",
                self.severity, self.rule_id, self.line, column, self.message
            ),
            None => write!(
                f,
                "{} [{}] Line {}: {}",
                self.severity, self.rule_id, self.line, self.message
            ),
        }
    }
}
