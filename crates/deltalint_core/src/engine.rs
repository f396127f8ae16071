//! Run orchestration.
//!
//! A run reads the change set, keeps the non-deleted target files, then hands
//! them to each enabled analyzer group in turn. A group that fails is recorded
//! in the report and does not stop the groups after it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::analyzer::{Analyzer, AnalyzerKind, BatchOutcome};
use crate::applicability::Applicability;
use crate::changeset::{ChangeSetProvider, FileChange};
use crate::config::{LinterConfig, Rule};
use crate::custom_analyzer::CustomAnalyzer;
use crate::format_analyzer::FormatAnalyzer;
use crate::report::{GroupFailure, LintReport};
use crate::rules::RuleRegistry;
use crate::runner::ToolRunner;
use crate::LinterError;

struct AnalyzerGroup {
    rules: Vec<Rule>,
    analyzer: Box<dyn Analyzer>,
}

/// The incremental linter.
pub struct LintEngine {
    config: LinterConfig,
    groups: Vec<AnalyzerGroup>,
}

/// Builder for [`LintEngine`].
pub struct LintEngineBuilder {
    config: LinterConfig,
    runner: Option<Arc<dyn ToolRunner>>,
    registry: Option<RuleRegistry>,
}

impl LintEngineBuilder {
    /// Runner for the external format tool.
    pub fn tool_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Rule implementations for the custom group.
    pub fn registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validates every group's rules and assembles the engine.
    pub fn build(self) -> Result<LintEngine, LinterError> {
        let analyzers = &self.config.analyzers;
        let mut groups = Vec::new();

        if analyzers.format.enabled {
            Applicability::new(&analyzers.format.rules)?;
            let mut analyzer = FormatAnalyzer::new(&analyzers.format);
            if let Some(runner) = self.runner {
                analyzer = analyzer.with_runner(runner);
            }
            groups.push(AnalyzerGroup {
                rules: analyzers.format.rules.clone(),
                analyzer: Box::new(analyzer),
            });
        }

        if analyzers.custom.enabled {
            Applicability::new(&analyzers.custom.rules)?;
            let registry = self
                .registry
                .unwrap_or_else(RuleRegistry::with_builtin_rules);
            groups.push(AnalyzerGroup {
                rules: analyzers.custom.rules.clone(),
                analyzer: Box::new(CustomAnalyzer::new(registry)),
            });
        }

        if analyzers.ai.enabled {
            warn!(
                "AI analyzer ('{}') is not implemented; skipping",
                analyzers.ai.provider
            );
        }

        Ok(LintEngine {
            config: self.config,
            groups,
        })
    }
}

impl LintEngine {
    /// Creates an engine with the default process runner and built-in rules.
    pub fn new(config: LinterConfig) -> Result<Self, LinterError> {
        Self::builder(config).build()
    }

    pub fn builder(config: LinterConfig) -> LintEngineBuilder {
        LintEngineBuilder {
            config,
            runner: None,
            registry: None,
        }
    }

    pub fn config(&self) -> &LinterConfig {
        &self.config
    }

    /// Enabled groups in execution order.
    pub fn groups(&self) -> Vec<AnalyzerKind> {
        self.groups.iter().map(|g| g.analyzer.kind()).collect()
    }

    /// Checks that every enabled group can run.
    pub fn preflight(&self) -> Result<(), LinterError> {
        for group in &self.groups {
            if let Some(detail) = group.analyzer.preflight()? {
                info!("{} analyzer ready: {}", group.analyzer.kind(), detail);
            }
        }
        Ok(())
    }

    /// Runs every enabled group over the change set.
    ///
    /// Only change-set retrieval failures are returned as errors; a failing
    /// group is recorded in [`LintReport::failures`].
    pub fn execute(&self, provider: &dyn ChangeSetProvider) -> Result<LintReport, LinterError> {
        let started = Instant::now();
        let executed_at = Utc::now();

        let changes = provider.changed_files()?;
        let targets: Vec<FileChange> = changes
            .into_iter()
            .filter(|change| !change.deleted && self.config.is_target_file(&change.path))
            .collect();
        let files_checked = targets
            .iter()
            .map(|change| change.path.as_path())
            .collect::<HashSet<_>>()
            .len();
        info!("{} target file(s) changed", files_checked);

        let mut report = LintReport {
            executed_at,
            files_checked,
            ..LintReport::new()
        };

        for group in &self.groups {
            let kind = group.analyzer.kind();
            match run_group(group, &targets) {
                Ok(outcome) => {
                    debug!("{} group: {} finding(s)", kind, outcome.findings.len());
                    report.findings.extend(outcome.findings);
                    report.stats += outcome.stats;
                }
                Err(e) => {
                    warn!("{} group failed: {}", kind, e);
                    report.failures.push(GroupFailure {
                        group: kind,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.execution_time = started.elapsed();
        Ok(report)
    }
}

fn run_group(group: &AnalyzerGroup, targets: &[FileChange]) -> Result<BatchOutcome, LinterError> {
    let selection = Applicability::new(&group.rules)?.select(targets);
    if selection.is_empty() {
        debug!("{} group: no applicable rules", group.analyzer.kind());
        return Ok(BatchOutcome::default());
    }
    group.analyzer.analyze(&selection, &group.rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::StaticChangeSet;
    use crate::config::ApplyTo;
    use crate::runner::{Invocation, ToolOutput};
    use crate::Severity;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Mutex;

    struct ScriptedRunner {
        stdout: String,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl ScriptedRunner {
        fn new(stdout: &str) -> Arc<Self> {
            Arc::new(Self {
                stdout: stdout.to_string(),
                fail: false,
                calls: Mutex::new(0),
            })
        }
    }

    impl ToolRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation) -> Result<ToolOutput, LinterError> {
            *self.calls.lock().unwrap() += 1;
            if self.fail {
                return Err(LinterError::tool_launch(&invocation.program, "not found"));
            }
            Ok(ToolOutput {
                code: Some(0),
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    fn config(format: Vec<Rule>, custom: Vec<Rule>) -> LinterConfig {
        let mut config = LinterConfig::new();
        config.target_extensions = vec![".cs".to_string()];
        config.analyzers.format.enabled = !format.is_empty();
        config.analyzers.format.rules = format;
        config.analyzers.custom.enabled = !custom.is_empty();
        config.analyzers.custom.rules = custom;
        config
    }

    #[test]
    fn test_format_group_end_to_end() {
        let runner = ScriptedRunner::new("A.cs(1,1): warning X1: demo\n");
        let engine = LintEngine::builder(config(
            vec![Rule::new("X1").apply_to(&[ApplyTo::New]).patterns(&["*.cs"])],
            vec![],
        ))
        .tool_runner(runner.clone())
        .build()
        .unwrap();

        let report = engine
            .execute(&StaticChangeSet(vec![FileChange::added("/repo/A.cs")]))
            .unwrap();

        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].rule_id, "X1");
        assert_eq!(report.findings[0].line, 1);
        assert_eq!(report.findings[0].column, Some(1));
        assert_eq!(report.files_checked, 1);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(*runner.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_deleted_and_non_target_files_are_skipped() {
        let runner = ScriptedRunner::new("");
        let engine = LintEngine::builder(config(
            vec![Rule::new("X1").apply_to(&[ApplyTo::All])],
            vec![],
        ))
        .tool_runner(runner.clone())
        .build()
        .unwrap();

        let report = engine
            .execute(&StaticChangeSet(vec![
                FileChange::deleted("/repo/Gone.cs"),
                FileChange::added("/repo/readme.md"),
            ]))
            .unwrap();

        assert_eq!(report.files_checked, 0);
        assert!(report.findings.is_empty());
        assert_eq!(*runner.calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_failed_group_does_not_stop_custom_group() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("A.cs");
        fs::write(&file, "a\nb\n").unwrap();

        let runner = Arc::new(ScriptedRunner {
            stdout: String::new(),
            fail: true,
            calls: Mutex::new(0),
        });
        let engine = LintEngine::builder(config(
            vec![Rule::new("X1").apply_to(&[ApplyTo::All])],
            vec![
                Rule::new("CRLF")
                    .apply_to(&[ApplyTo::All])
                    .severity(Severity::Error),
            ],
        ))
        .tool_runner(runner)
        .build()
        .unwrap();

        let report = engine
            .execute(&StaticChangeSet(vec![FileChange::added(&file)]))
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].group, AnalyzerKind::Format);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].rule_id, "CRLF");
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_bracket_patterns_are_literal() {
        let engine = LintEngine::new(config(
            vec![],
            vec![Rule::new("CRLF").apply_to(&[ApplyTo::All]).patterns(&["Gen[.cs"])],
        ))
        .unwrap();
        assert_eq!(engine.groups(), vec![AnalyzerKind::Custom]);
    }

    #[test]
    fn test_disabled_groups_are_not_built() {
        let engine = LintEngine::new(config(vec![], vec![])).unwrap();
        assert!(engine.groups().is_empty());
        let report = engine
            .execute(&StaticChangeSet(vec![FileChange::added("/repo/A.cs")]))
            .unwrap();
        assert_eq!(report.files_checked, 1);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_change_set_error_is_returned() {
        struct Broken;
        impl ChangeSetProvider for Broken {
            fn changed_files(&self) -> Result<Vec<FileChange>, LinterError> {
                Err(LinterError::git("not a git repository"))
            }
        }

        let engine = LintEngine::new(config(vec![], vec![])).unwrap();
        assert!(matches!(engine.execute(&Broken), Err(LinterError::Git(_))));
    }
}
