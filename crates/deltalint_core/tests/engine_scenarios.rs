//! End-to-end runs against real git repositories and a stub format tool.
//!
//! The stub is a shell script standing in for `dotnet`. It appends its working
//! directory to a log file and prints canned diagnostics, so the tests can see
//! how many times it ran and whether its workspace was cleaned up.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use deltalint_core::{
    AnalyzerKind, GitChangeSet, GitMode, LintEngine, LinterConfig, LinterError, Severity,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git available");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
}

fn commit_files(files: &[(&str, &str)]) -> TempDir {
    let repo = TempDir::new().unwrap();
    git(repo.path(), &["init", "-q"]);
    git(repo.path(), &["config", "user.email", "dev@example.com"]);
    git(repo.path(), &["config", "user.name", "Dev"]);
    git(repo.path(), &["config", "commit.gpgsign", "false"]);
    git(repo.path(), &["config", "core.autocrlf", "false"]);
    for (name, content) in files {
        let path = repo.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "-q", "-m", "change"]);
    repo
}

struct StubTool {
    _dir: TempDir,
    script: PathBuf,
    log: PathBuf,
}

impl StubTool {
    fn new(body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("fake-dotnet");
        let log = dir.path().join("invocations.log");
        let content = format!(
            "#!/bin/sh\necho \"$PWD\" >> '{}'\n{}\n",
            log.display(),
            body
        );
        fs::write(&script, content).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        Self {
            _dir: dir,
            script,
            log,
        }
    }

    fn printing(lines: &[&str]) -> Self {
        let body: Vec<String> = lines.iter().map(|l| format!("echo '{}'", l)).collect();
        Self::new(&format!("{}\nexit 2", body.join("\n")))
    }

    fn invocations(&self) -> Vec<PathBuf> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(PathBuf::from)
            .collect()
    }
}

fn load_config(text: &str, tool: &StubTool) -> LinterConfig {
    let mut config = LinterConfig::from_jsonc(text).unwrap();
    config.analyzers.format.command = tool.script.to_string_lossy().into_owned();
    config
}

const FORMAT_X1: &str = r#"{
    "gitMode": "commit",
    "targetExtensions": [".cs"],
    "analyzers": {
        "format": {
            "enabled": true,
            "rules": [
                { "id": "X1", "name": "demo", "applyTo": ["new"], "filePatterns": ["*.cs"] }
            ]
        }
    }
}"#;

#[test]
fn test_new_file_gets_one_finding() {
    let repo = commit_files(&[("A.cs", "class A {}\r\n")]);
    let tool = StubTool::printing(&["A.cs(1,1): warning X1: demo [/tmp/x/deltalint.csproj]"]);
    let config = load_config(FORMAT_X1, &tool);

    let engine = LintEngine::new(config).unwrap();
    let report = engine
        .execute(&GitChangeSet::new(repo.path(), GitMode::Commit))
        .unwrap();

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.rule_id, "X1");
    assert_eq!(finding.message, "demo");
    assert_eq!((finding.line, finding.column), (1, Some(1)));
    assert_eq!(finding.severity, Severity::Warning);
    assert!(finding.file_path.ends_with("A.cs"));
    assert_eq!(report.files_checked, 1);
    assert_eq!(report.exit_code(), 0);

    let invocations = tool.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(!invocations[0].exists(), "workspace left behind");
}

#[test]
fn test_many_files_one_invocation() {
    let repo = commit_files(&[
        ("A.cs", "class A {}"),
        ("src/B.cs", "class B {}"),
        ("src/deep/C.cs", "class C {}"),
        ("notes.txt", "ignored"),
    ]);
    let tool = StubTool::printing(&[
        "src/B.cs(2,5): error X1: broken",
        "C.cs(3,1): warning X1: style",
        "A.cs(1,1): warning IDE0055: not requested",
    ]);
    let engine = LintEngine::new(load_config(FORMAT_X1, &tool)).unwrap();
    let report = engine
        .execute(&GitChangeSet::new(repo.path(), GitMode::Commit))
        .unwrap();

    assert_eq!(tool.invocations().len(), 1);
    assert_eq!(report.files_checked, 3);
    let rules: Vec<(&str, Severity)> = report
        .findings
        .iter()
        .map(|f| (f.rule_id.as_str(), f.severity))
        .collect();
    assert_eq!(rules, vec![("X1", Severity::Error), ("X1", Severity::Warning)]);
    assert_eq!(report.stats.unrequested_rule, 1);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_ambiguous_file_token_is_dropped() {
    let repo = commit_files(&[("a/X.cs", "class X {}"), ("b/X.cs", "class X {}")]);
    let tool = StubTool::printing(&["X.cs(1,1): warning X1: which one?"]);
    let engine = LintEngine::new(load_config(FORMAT_X1, &tool)).unwrap();
    let report = engine
        .execute(&GitChangeSet::new(repo.path(), GitMode::Commit))
        .unwrap();

    assert!(report.findings.is_empty());
    assert_eq!(report.stats.ambiguous_path, 1);
    assert_eq!(report.stats.unreconciled(), 1);
}

#[test]
fn test_timeout_is_recorded_and_workspace_removed() {
    let repo = commit_files(&[("A.cs", "class A {}")]);
    let tool = StubTool::new("exec sleep 30");
    let mut config = load_config(FORMAT_X1, &tool);
    config.analyzers.format.timeout_seconds = Some(1);

    let report = LintEngine::new(config)
        .unwrap()
        .execute(&GitChangeSet::new(repo.path(), GitMode::Commit))
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].group, AnalyzerKind::Format);
    assert!(report.failures[0].message.contains("did not finish"));
    let invocations = tool.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(!invocations[0].exists(), "workspace left behind");
}

#[test]
fn test_format_and_custom_groups_together() {
    let repo = commit_files(&[("Crlf.cs", "a\r\nb\r\n"), ("Lf.cs", "a\nb\n")]);
    let tool = StubTool::printing(&["Lf.cs(1,1): info X1: fyi"]);
    let text = r#"{
        "gitMode": "commit",
        "targetExtensions": [".cs"],
        "analyzers": {
            "format": {
                "enabled": true,
                "rules": [{ "id": "X1", "applyTo": ["all"] }]
            },
            "custom": {
                "enabled": true,
                "rules": [{ "id": "CRLF", "severity": "error", "applyTo": ["new", "modified"] }]
            }
        }
    }"#;

    let report = LintEngine::new(load_config(text, &tool))
        .unwrap()
        .execute(&GitChangeSet::new(repo.path(), GitMode::Commit))
        .unwrap();

    let summary: Vec<(String, String, Severity)> = report
        .findings
        .iter()
        .map(|f| {
            (
                f.rule_id.clone(),
                f.file_path.file_name().unwrap().to_string_lossy().into_owned(),
                f.severity,
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("X1".to_string(), "Lf.cs".to_string(), Severity::Info),
            ("CRLF".to_string(), "Lf.cs".to_string(), Severity::Error),
        ]
    );
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_missing_tool_fails_preflight() {
    let mut config = LinterConfig::from_jsonc(FORMAT_X1).unwrap();
    config.analyzers.format.command = "/nonexistent/dotnet".to_string();

    let err = LintEngine::new(config).unwrap().preflight().unwrap_err();
    assert!(matches!(err, LinterError::ToolLaunch { .. }));
}
