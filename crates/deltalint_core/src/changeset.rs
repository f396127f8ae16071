//! Change-set retrieval.
//!
//! A change set is the list of files a run is allowed to look at, each tagged
//! with how it changed. [`GitChangeSet`] reads it from a git repository by
//! shelling out to `git`.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::{GitMode, LinterError};

/// One changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Absolute path.
    pub path: PathBuf,
    pub added: bool,
    pub modified: bool,
    pub deleted: bool,
}

impl FileChange {
    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            added: true,
            modified: false,
            deleted: false,
        }
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            added: false,
            modified: true,
            deleted: false,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            added: false,
            modified: false,
            deleted: true,
        }
    }

    fn from_status(status: &str, path: PathBuf) -> Option<Self> {
        match status.chars().next()? {
            'A' => Some(Self::added(path)),
            'M' | 'T' => Some(Self::modified(path)),
            'D' => Some(Self::deleted(path)),
            _ => None,
        }
    }
}

/// Source of the files to lint.
pub trait ChangeSetProvider {
    /// Returns the changed files in a stable order.
    fn changed_files(&self) -> Result<Vec<FileChange>, LinterError>;
}

/// A fixed, in-memory change set.
#[derive(Debug, Clone, Default)]
pub struct StaticChangeSet(pub Vec<FileChange>);

impl ChangeSetProvider for StaticChangeSet {
    fn changed_files(&self) -> Result<Vec<FileChange>, LinterError> {
        Ok(self.0.clone())
    }
}

/// Change set read from a git repository.
#[derive(Debug, Clone)]
pub struct GitChangeSet {
    repo: PathBuf,
    mode: GitMode,
}

impl GitChangeSet {
    pub fn new(repo: impl Into<PathBuf>, mode: GitMode) -> Self {
        Self {
            repo: repo.into(),
            mode,
        }
    }

    fn toplevel(&self) -> Result<PathBuf, LinterError> {
        let out = run_git(&self.repo, &["rev-parse", "--show-toplevel"])?;
        let root = String::from_utf8_lossy(&out).trim().to_string();
        Ok(PathBuf::from(root))
    }

    fn staged(&self, root: &Path) -> Result<Vec<FileChange>, LinterError> {
        let out = run_git(
            &self.repo,
            &["diff", "--cached", "--name-status", "--no-renames", "-z"],
        )?;
        Ok(parse_name_status(&out, root))
    }

    fn last_commit(&self, root: &Path) -> Result<Vec<FileChange>, LinterError> {
        if has_parent(&self.repo) {
            let out = run_git(
                &self.repo,
                &["diff", "--name-status", "--no-renames", "-z", "HEAD^", "HEAD"],
            )?;
            return Ok(parse_name_status(&out, root));
        }

        debug!("HEAD has no parent; treating every tracked file as added");
        let out = run_git(&self.repo, &["ls-tree", "-r", "--name-only", "-z", "HEAD"])?;
        Ok(split_nul(&out)
            .map(|rel| FileChange::added(root.join(rel)))
            .collect())
    }
}

impl ChangeSetProvider for GitChangeSet {
    fn changed_files(&self) -> Result<Vec<FileChange>, LinterError> {
        let root = self.toplevel()?;
        let changes = match self.mode {
            GitMode::Staged => self.staged(&root)?,
            GitMode::Commit => self.last_commit(&root)?,
        };
        debug!(
            "{} changed file(s) in {} ({:?} mode)",
            changes.len(),
            root.display(),
            self.mode
        );
        Ok(changes)
    }
}

fn has_parent(repo: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["rev-parse", "--verify", "--quiet", "HEAD^"])
        .output()
        .is_ok_and(|out| out.status.success())
}

fn run_git(repo: &Path, args: &[&str]) -> Result<Vec<u8>, LinterError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .map_err(|e| LinterError::git(format!("failed to run git {}: {}", args.join(" "), e)))?;

    if !output.status.success() {
        return Err(LinterError::git(format!(
            "git {} failed in {}: {}",
            args.join(" "),
            repo.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(output.stdout)
}

fn split_nul(bytes: &[u8]) -> impl Iterator<Item = String> + '_ {
    bytes
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
}

/// Parses `--name-status -z` output: alternating status and path fields.
fn parse_name_status(bytes: &[u8], root: &Path) -> Vec<FileChange> {
    let fields: Vec<String> = split_nul(bytes).collect();
    fields
        .chunks_exact(2)
        .filter_map(|pair| FileChange::from_status(&pair[0], root.join(&pair[1])))
        .collect()
}
