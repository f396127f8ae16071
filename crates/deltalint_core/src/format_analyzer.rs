//! Analyzer group backed by `dotnet format`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::analyzer::{Analyzer, AnalyzerKind, BatchOutcome};
use crate::applicability::Selection;
use crate::config::{FormatSettings, Rule};
use crate::runner::{Invocation, ProcessRunner, ToolRunner};
use crate::tool_output::parse_tool_output;
use crate::workspace::{EphemeralWorkspace, RuleSettings};
use crate::LinterError;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs one external tool invocation per batch.
pub struct FormatAnalyzer {
    command: String,
    timeout: Option<Duration>,
    settings: RuleSettings,
    runner: Arc<dyn ToolRunner>,
}

impl FormatAnalyzer {
    pub fn new(settings: &FormatSettings) -> Self {
        Self {
            command: settings.command.clone(),
            timeout: settings.timeout_seconds.map(Duration::from_secs),
            settings: RuleSettings::builtin().with_overrides(&settings.rule_settings),
            runner: Arc::new(ProcessRunner),
        }
    }

    /// Replaces the process runner.
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Verifies that `<command> format --version` succeeds.
    pub fn check_available(&self) -> Result<String, LinterError> {
        let cwd = std::env::current_dir()?;
        let invocation = Invocation::new(&self.command, cwd)
            .arg("format")
            .arg("--version")
            .timeout(Some(VERSION_CHECK_TIMEOUT));
        let output = self.runner.run(&invocation)?;

        if !output.success() {
            return Err(LinterError::tool_launch(
                &self.command,
                format!(
                    "'{} format --version' failed: {}",
                    self.command,
                    output.combined().trim()
                ),
            ));
        }

        let version = output.stdout.trim().to_string();
        debug!("{} format version {}", self.command, version);
        Ok(version)
    }

    /// Analyzes `files` for `rule_ids` with a single tool invocation.
    ///
    /// The workspace is removed before this returns, whether the invocation
    /// succeeded or not.
    pub fn analyze_batch(
        &self,
        files: &[PathBuf],
        rule_ids: &[String],
    ) -> Result<BatchOutcome, LinterError> {
        if files.is_empty() || rule_ids.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let workspace = EphemeralWorkspace::builder()
            .files(files)
            .rule_ids(rule_ids)
            .settings(self.settings.clone())
            .build()?;

        info!(
            "Running {} format on {} file(s) for {} rule(s)",
            self.command,
            files.len(),
            rule_ids.len()
        );
        let output = self.runner.run(&self.invocation(&workspace))?;
        if !output.success() {
            // --verify-no-changes exits non-zero whenever it reports anything.
            debug!("{} format exited with {:?}", self.command, output.code);
        }

        let outcome = parse_tool_output(&output.combined(), rule_ids, files);
        workspace.close();

        debug!(
            "{} finding(s), {} unreconciled",
            outcome.findings.len(),
            outcome.stats.unreconciled()
        );
        Ok(outcome)
    }

    fn invocation(&self, workspace: &EphemeralWorkspace) -> Invocation {
        Invocation::new(&self.command, workspace.path())
            .arg("format")
            .arg(workspace.manifest_path())
            .arg("--verify-no-changes")
            .arg("--severity")
            .arg("info")
            .arg("--verbosity")
            .arg("diagnostic")
            .timeout(self.timeout)
    }
}

impl Analyzer for FormatAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Format
    }

    fn preflight(&self) -> Result<Option<String>, LinterError> {
        self.check_available().map(Some)
    }

    fn analyze(&self, selection: &Selection, _rules: &[Rule]) -> Result<BatchOutcome, LinterError> {
        self.analyze_batch(&selection.files(), &selection.rule_ids())
    }
}
