//! Ephemeral workspace for one external analyzer batch.
//!
//! The workspace is a private temporary directory holding a generated
//! analyzer configuration and a project manifest that lists the batch's
//! files by absolute path. It is removed when the [`EphemeralWorkspace`] is
//! dropped, on success and on every error path.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::LinterError;

/// File name of the generated analyzer configuration.
pub const CONFIG_FILE: &str = "deltalint.globalconfig";
/// File name of the generated project manifest.
pub const MANIFEST_FILE: &str = "deltalint.csproj";

/// Severity every requested rule is raised to.
const BASELINE_LEVEL: &str = "warning";

const DEFAULT_TARGET_FRAMEWORK: &str = "net8.0";
const DEFAULT_LANG_VERSION: &str = "latest";

/// Style options some rules need before the tool reports them at all.
const SUPPLEMENTAL_SETTINGS: &[(&str, &[(&str, &str)])] = &[
    (
        "IDE0290",
        &[("csharp_style_prefer_primary_constructors", "true")],
    ),
    ("IDE0032", &[("dotnet_style_prefer_auto_properties", "true")]),
    (
        "IDE0009",
        &[
            ("dotnet_style_qualification_for_field", "true"),
            ("dotnet_style_qualification_for_property", "true"),
            ("dotnet_style_qualification_for_method", "true"),
            ("dotnet_style_qualification_for_event", "true"),
        ],
    ),
    ("IDE0161", &[("csharp_style_namespace_declarations", "file_scoped")]),
    ("IDE0065", &[("csharp_using_directive_placement", "outside_namespace")]),
];

/// Extra configuration keys per rule id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSettings {
    table: BTreeMap<String, BTreeMap<String, String>>,
}

impl RuleSettings {
    /// The built-in table.
    pub fn builtin() -> Self {
        let table = SUPPLEMENTAL_SETTINGS
            .iter()
            .map(|(id, pairs)| {
                let pairs = pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                (id.to_string(), pairs)
            })
            .collect();
        Self { table }
    }

    /// Adds or replaces keys; `overrides` wins over existing entries.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        for (id, pairs) in overrides {
            let entry = self.table.entry(id.clone()).or_default();
            for (key, value) in pairs {
                entry.insert(key.clone(), value.clone());
            }
        }
        self
    }

    pub fn get(&self, rule_id: &str) -> Option<&BTreeMap<String, String>> {
        self.table.get(rule_id)
    }
}

/// A temporary directory that lives for exactly one batch.
#[derive(Debug)]
pub struct EphemeralWorkspace {
    dir: TempDir,
    config_path: PathBuf,
    manifest_path: PathBuf,
}

impl EphemeralWorkspace {
    pub fn builder() -> WorkspaceBuilder {
        WorkspaceBuilder::default()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Removes the directory now, logging instead of failing.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }
}

/// Builder for [`EphemeralWorkspace`].
#[derive(Debug, Default)]
pub struct WorkspaceBuilder {
    files: Vec<PathBuf>,
    rule_ids: Vec<String>,
    settings: RuleSettings,
    target_framework: Option<String>,
    lang_version: Option<String>,
}

impl WorkspaceBuilder {
    /// Absolute paths of the files to analyze.
    pub fn files(mut self, files: &[PathBuf]) -> Self {
        self.files = files.to_vec();
        self
    }

    /// Rule ids to enable.
    pub fn rule_ids(mut self, ids: &[String]) -> Self {
        self.rule_ids = ids.to_vec();
        self
    }

    pub fn settings(mut self, settings: RuleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn target_framework(mut self, framework: impl Into<String>) -> Self {
        self.target_framework = Some(framework.into());
        self
    }

    pub fn lang_version(mut self, version: impl Into<String>) -> Self {
        self.lang_version = Some(version.into());
        self
    }

    /// Creates the directory and writes both generated files.
    pub fn build(self) -> Result<EphemeralWorkspace, LinterError> {
        let dir = tempfile::Builder::new().prefix("deltalint_").tempdir()?;
        let config_path = dir.path().join(CONFIG_FILE);
        let manifest_path = dir.path().join(MANIFEST_FILE);

        // On failure `dir` is dropped here, which removes it.
        fs::write(&config_path, render_config(&self.rule_ids, &self.settings))?;
        fs::write(
            &manifest_path,
            render_manifest(
                &self.files,
                &config_path,
                self.target_framework.as_deref().unwrap_or(DEFAULT_TARGET_FRAMEWORK),
                self.lang_version.as_deref().unwrap_or(DEFAULT_LANG_VERSION),
            ),
        )?;

        debug!(
            "Created workspace {} ({} file(s), {} rule(s))",
            dir.path().display(),
            self.files.len(),
            self.rule_ids.len()
        );

        Ok(EphemeralWorkspace {
            dir,
            config_path,
            manifest_path,
        })
    }
}

/// Renders a global analyzer config enabling `rule_ids` at the baseline level.
///
/// A global config applies to every compiled file regardless of where it
/// lives, so the batch's files do not need to sit under the workspace.
pub fn render_config(rule_ids: &[String], settings: &RuleSettings) -> String {
    let mut out = String::from("is_global = true\nglobal_level = 100\n\n");

    for id in rule_ids {
        out.push_str(&format!(
            "dotnet_diagnostic.{}.severity = {}\n",
            id, BASELINE_LEVEL
        ));
    }

    let mut written = HashSet::new();
    let mut extra = String::new();
    for id in rule_ids {
        let Some(pairs) = settings.get(id) else {
            continue;
        };
        for (key, value) in pairs {
            if written.insert(key.as_str()) {
                extra.push_str(&format!("{} = {}\n", key, value));
            }
        }
    }
    if !extra.is_empty() {
        out.push('\n');
        out.push_str(&extra);
    }

    out
}

/// Renders a minimal SDK-style project listing `files` explicitly.
pub fn render_manifest(
    files: &[PathBuf],
    config_path: &Path,
    target_framework: &str,
    lang_version: &str,
) -> String {
    let mut out = String::new();
    out.push_str("<Project Sdk=\"Microsoft.NET.Sdk\">\n");
    out.push_str("  <PropertyGroup>\n");
    out.push_str(&format!(
        "    <TargetFramework>{}</TargetFramework>\n",
        xml_escape(target_framework)
    ));
    out.push_str(&format!(
        "    <LangVersion>{}</LangVersion>\n",
        xml_escape(lang_version)
    ));
    out.push_str("    <Nullable>enable</Nullable>\n");
    out.push_str("    <EnableDefaultCompileItems>false</EnableDefaultCompileItems>\n");
    out.push_str("  </PropertyGroup>\n");
    out.push_str("  <ItemGroup>\n");
    out.push_str(&format!(
        "    <GlobalAnalyzerConfigFiles Include=\"{}\" />\n",
        xml_escape(&config_path.to_string_lossy())
    ));
    out.push_str("  </ItemGroup>\n");
    out.push_str("  <ItemGroup>\n");
    for file in files {
        out.push_str(&format!(
            "    <Compile Include=\"{}\" />\n",
            xml_escape(&file.to_string_lossy())
        ));
    }
    out.push_str("  </ItemGroup>\n");
    out.push_str("</Project>\n");
    out
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
