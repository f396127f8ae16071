//! # deltalint_core
//!
//! Core engine for deltalint, an incremental linter for changed files.
//!
//! This crate provides:
//! - Configuration loading and validation
//! - Change-set retrieval from git
//! - Per-rule applicability filtering
//! - A batched external analyzer adapter and in-process rules
//! - Report aggregation
//!
//! ## Example
//!
//! ```rust,ignore
//! use deltalint_core::{GitChangeSet, LintEngine, LinterConfig};
//!
//! let config = LinterConfig::from_file("deltalint.jsonc")?;
//! let provider = GitChangeSet::new(".", config.git_mode);
//! let engine = LintEngine::new(config)?;
//!
//! let report = engine.execute(&provider)?;
//! for finding in &report.findings {
//!     println!("{}", finding);
//! }
//! std::process::exit(report.exit_code().into());
//! ```

mod analyzer;
pub mod applicability;
pub mod changeset;
mod config;
mod custom_analyzer;
mod engine;
mod env_expand;
mod error;
mod finding;
mod format_analyzer;
pub mod report;
pub mod rules;
pub mod runner;
pub mod tool_output;
pub mod workspace;

pub use analyzer::{Analyzer, AnalyzerKind, BatchOutcome, BatchStats};
pub use applicability::{Applicability, Selection, glob_matches};
pub use changeset::{ChangeSetProvider, FileChange, GitChangeSet, StaticChangeSet};
pub use config::{
    AiProviderConfig, AiSettings, AnalyzerSettings, ApplyTo, CustomSettings, FormatSettings,
    GitMode, LinterConfig, Rule,
};
pub use custom_analyzer::CustomAnalyzer;
pub use engine::{LintEngine, LintEngineBuilder};
pub use env_expand::expand_env_vars;
pub use error::LinterError;
pub use finding::{Finding, Severity};
pub use format_analyzer::FormatAnalyzer;
pub use report::{GroupFailure, LintReport};
pub use rules::{FileRule, LineEndings, RuleRegistry};
pub use runner::{Invocation, ProcessRunner, ToolOutput, ToolRunner};
pub use tool_output::{Reconciled, parse_tool_output, reconcile_path};
pub use workspace::{EphemeralWorkspace, RuleSettings};
