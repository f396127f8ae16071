//! Analyzer group for in-process rules.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::analyzer::{Analyzer, AnalyzerKind, BatchOutcome};
use crate::applicability::Selection;
use crate::config::Rule;
use crate::rules::RuleRegistry;
use crate::{Finding, LinterError, Severity};

/// Runs registered [`FileRule`](crate::rules::FileRule)s over selected files.
pub struct CustomAnalyzer {
    registry: RuleRegistry,
}

enum PairResult {
    Clean,
    Found(Finding),
    Unknown(String),
    Failed(PathBuf, String, LinterError),
}

impl CustomAnalyzer {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    /// Evaluates every selected (file, rule) pair in parallel.
    ///
    /// Findings come back in selection order and carry the catalog severity.
    pub fn analyze_batch(&self, selection: &Selection, rules: &[Rule]) -> BatchOutcome {
        let severities: HashMap<&str, Severity> = rules
            .iter()
            .map(|rule| (rule.id.as_str(), rule.severity))
            .collect();

        let pairs: Vec<(&PathBuf, &String)> = selection
            .by_file
            .iter()
            .flat_map(|(path, ids)| ids.iter().map(move |id| (path, id)))
            .collect();

        let results: Vec<PairResult> = pairs
            .par_iter()
            .map(|(path, id)| {
                let Some(rule) = self.registry.get(id) else {
                    return PairResult::Unknown((*id).clone());
                };
                match rule.check(path) {
                    Ok(Some(finding)) => {
                        let severity = severities.get(id.as_str()).copied().unwrap_or_default();
                        PairResult::Found(finding.with_severity(severity))
                    }
                    Ok(None) => PairResult::Clean,
                    Err(e) => PairResult::Failed((*path).clone(), (*id).clone(), e),
                }
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        let mut unknown = BTreeSet::new();
        for result in results {
            match result {
                PairResult::Clean => {}
                PairResult::Found(finding) => outcome.findings.push(finding),
                PairResult::Unknown(id) => {
                    outcome.stats.unknown_rule += 1;
                    unknown.insert(id);
                }
                PairResult::Failed(path, id, error) => {
                    warn!("Rule {} failed on {}: {}", id, path.display(), error);
                    outcome.stats.failed_pairs += 1;
                }
            }
        }
        for id in unknown {
            warn!("No in-process implementation for rule '{}'; skipping", id);
        }

        debug!(
            "{} pair(s) checked, {} finding(s)",
            pairs.len(),
            outcome.findings.len()
        );
        outcome
    }
}

impl Default for CustomAnalyzer {
    fn default() -> Self {
        Self::new(RuleRegistry::with_builtin_rules())
    }
}

impl Analyzer for CustomAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Custom
    }

    fn analyze(&self, selection: &Selection, rules: &[Rule]) -> Result<BatchOutcome, LinterError> {
        Ok(self.analyze_batch(selection, rules))
    }
}
