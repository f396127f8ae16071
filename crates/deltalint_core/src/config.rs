//! Linter configuration.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use jsonc_parser::ParseOptions;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::env_expand::expand_env_vars;
use crate::{LinterError, Severity};

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Configuration for a lint run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinterConfig {
    /// Which change set to lint.
    #[serde(default)]
    pub git_mode: GitMode,

    /// File extensions to consider (e.g. `.cs`). Empty accepts every file.
    #[serde(default)]
    pub target_extensions: Vec<String>,

    /// Per-group analyzer settings.
    #[serde(default)]
    pub analyzers: AnalyzerSettings,

    /// Directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Source of the change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitMode {
    /// Changes staged in the index.
    #[default]
    Staged,
    /// The latest commit against its first parent.
    Commit,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerSettings {
    /// Rules delegated to the external format tool.
    #[serde(default)]
    pub format: FormatSettings,

    /// Rules run in-process.
    #[serde(default)]
    pub custom: CustomSettings,

    /// AI-backed rules. Recognised but not executed.
    #[serde(default)]
    pub ai: AiSettings,
}

/// Settings of the external-tool group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub rules: Vec<Rule>,

    /// Program to launch.
    #[serde(default = "default_command")]
    pub command: String,

    /// Deadline for the whole batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Extra analyzer config entries per rule id, merged over the built-in table.
    #[serde(default)]
    pub rule_settings: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_command() -> String {
    "dotnet".to_string()
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            rules: Vec::new(),
            command: default_command(),
            timeout_seconds: None,
            rule_settings: BTreeMap::new(),
        }
    }
}

/// Settings of the in-process group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub rules_path: String,

    #[serde(default)]
    pub api_config: BTreeMap<String, AiProviderConfig>,
}

fn default_provider() -> String {
    "claude".to_string()
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            rules_path: String::new(),
            api_config: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub endpoint: String,
}

/// A rule definition from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Unique rule id (e.g. `IDE0290`).
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub severity: Severity,

    /// Change kinds the rule applies to. Empty means the rule never applies.
    #[serde(default)]
    pub apply_to: Vec<ApplyTo>,

    /// Base-name globs. Empty matches every file.
    #[serde(default)]
    pub file_patterns: Vec<String>,
}

impl Rule {
    /// Creates a warning-level rule that applies to no file yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            severity: Severity::Warning,
            apply_to: Vec::new(),
            file_patterns: Vec::new(),
        }
    }

    pub fn apply_to(mut self, kinds: &[ApplyTo]) -> Self {
        self.apply_to = kinds.to_vec();
        self
    }

    pub fn patterns(mut self, patterns: &[&str]) -> Self {
        self.file_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Change kinds a rule can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyTo {
    All,
    New,
    Modified,
}

impl LinterConfig {
    /// Config file names, in discovery order.
    pub const CONFIG_FILES: &'static [&'static str] =
        &["deltalint.jsonc", "deltalint.json", ".deltalint.jsonc"];

    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the first config file present in `dir`.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        let dir = dir.as_ref();
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinterError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LinterError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_jsonc(&content)?;
        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }
        Ok(config)
    }

    /// Parses a JSONC document, expanding `${VAR}` references first.
    pub fn from_jsonc(text: &str) -> Result<Self, LinterError> {
        let expanded = expand_env_vars(text);
        let value = jsonc_parser::parse_to_serde_value(&expanded, &ParseOptions::default())
            .map_err(|e| LinterError::config(format!("Invalid JSONC: {}", e)))?
            .ok_or_else(|| LinterError::config("Configuration document is empty"))?;

        Self::from_value(value)
    }

    /// Validates and deserializes an already-parsed document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, LinterError> {
        let schema = CONFIG_SCHEMA.get_or_init(|| {
            let schema_json: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).expect("Invalid embedded config schema");
            Validator::new(&schema_json).expect("Invalid config schema compilation")
        });

        if let Err(e) = schema.validate(&value) {
            return Err(LinterError::config(format!(
                "Config validation failed: {} at {}",
                e,
                e.instance_path()
            )));
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| LinterError::config(format!("Invalid config: {}", e)))?;
        config.check_rules()?;
        Ok(config)
    }

    /// Enforces unique rule ids per group and flags rules that can never run.
    fn check_rules(&self) -> Result<(), LinterError> {
        let groups = [
            ("format", &self.analyzers.format.rules),
            ("custom", &self.analyzers.custom.rules),
        ];
        for (group, rules) in groups {
            let mut seen = HashSet::new();
            for rule in rules {
                if !seen.insert(rule.id.as_str()) {
                    return Err(LinterError::config(format!(
                        "Duplicate rule id '{}' in analyzers.{}",
                        rule.id, group
                    )));
                }
                if rule.apply_to.is_empty() {
                    warn!(
                        "Rule '{}' has an empty applyTo list and will not run",
                        rule.id
                    );
                }
            }
        }
        Ok(())
    }

    /// Returns `true` when `path` passes the extension filter.
    pub fn is_target_file(&self, path: &Path) -> bool {
        if self.target_extensions.is_empty() {
            return true;
        }
        let name = path.to_string_lossy().to_lowercase();
        self.target_extensions
            .iter()
            .any(|ext| name.ends_with(&ext.to_lowercase()))
    }
}
