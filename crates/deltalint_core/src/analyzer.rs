//! Analyzer abstraction shared by every analyzer group.

use std::fmt;
use std::ops::AddAssign;

use serde::Serialize;

use crate::applicability::Selection;
use crate::config::Rule;
use crate::{Finding, LinterError};

/// The analyzer groups a run can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// Rules delegated to the external format tool.
    Format,
    /// Rules implemented in-process.
    Custom,
    /// AI-backed rules. Not implemented.
    Ai,
}

impl AnalyzerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Custom => "custom",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for diagnostics an analyzer saw but did not turn into findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    /// Tool diagnostics for rule ids that were not requested.
    pub unrequested_rule: usize,
    /// Tool diagnostics whose file token matched no input path.
    pub unresolved_path: usize,
    /// Tool diagnostics whose file token matched several input paths.
    pub ambiguous_path: usize,
    /// In-process (file, rule) pairs with no registered implementation.
    pub unknown_rule: usize,
    /// In-process (file, rule) pairs that failed to run.
    pub failed_pairs: usize,
}

impl BatchStats {
    /// Findings lost because their file could not be mapped back.
    pub fn unreconciled(&self) -> usize {
        self.unresolved_path + self.ambiguous_path
    }

    /// Returns `true` when nothing was dropped except unrequested rules.
    pub fn is_clean(&self) -> bool {
        self.unreconciled() == 0 && self.unknown_rule == 0 && self.failed_pairs == 0
    }
}

impl AddAssign for BatchStats {
    fn add_assign(&mut self, other: Self) {
        self.unrequested_rule += other.unrequested_rule;
        self.unresolved_path += other.unresolved_path;
        self.ambiguous_path += other.ambiguous_path;
        self.unknown_rule += other.unknown_rule;
        self.failed_pairs += other.failed_pairs;
    }
}

/// Findings plus drop counters from one analyzer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub findings: Vec<Finding>,
    pub stats: BatchStats,
}

/// An analyzer group's executor.
pub trait Analyzer: Send + Sync {
    /// Which group this analyzer serves.
    fn kind(&self) -> AnalyzerKind;

    /// Checks that the analyzer can run at all.
    ///
    /// Returns a short description of the backing tool on success.
    fn preflight(&self) -> Result<Option<String>, LinterError> {
        Ok(None)
    }

    /// Analyzes the selected files.
    ///
    /// `rules` is the group's catalog; `selection` was computed from it.
    fn analyze(&self, selection: &Selection, rules: &[Rule]) -> Result<BatchOutcome, LinterError>;
}
