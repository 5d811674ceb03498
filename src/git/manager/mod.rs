//! Git subprocess backend

mod diff;
mod notes;
mod worktree;


pub use diff::parse_unified_diff;
pub use notes::NOTES_REF;

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::Vcs;
use crate::domain::Hunk;

/// Find the git repository root for a given path.
/// Returns None if the path is not inside a git repository.
pub fn find_git_root(path: &Path) -> Option<PathBuf> {
    let start_dir = if path.is_file() { path.parent()? } else { path };

    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(start_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Runs git commands against one repository
#[derive(Debug, Clone)]
pub struct GitManager {
    /// Root directory of the repository
    root: PathBuf,

    /// Base directory for review worktrees
    pub(super) worktrees_dir: PathBuf,
}

impl GitManager {
    /// Create a manager whose worktrees live under `<root>/.review/worktrees`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(".git").exists() {
            bail!("Not a git repository: {}", root.display());
        }

        let worktrees_dir = root.join(".review").join("worktrees");

        Ok(Self {
            root,
            worktrees_dir,
        })
    }

    /// Keep worktrees under `state_dir/worktrees` instead of the default.
    pub fn with_state_dir(mut self, state_dir: &Path) -> Self {
        self.worktrees_dir = state_dir.join("worktrees");
        self
    }

    /// Get the root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(super) fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("Failed to run git {}", args.first().unwrap_or(&"")))
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit.
    pub(super) fn git_stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.git(args)?;
        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for GitManager {
    fn repo_root(&self) -> &Path {
        &self.root
    }

    fn resolve_commit(&self, rev: &str) -> Result<String> {
        let spec = format!("{}^{{commit}}", rev.trim());
        let output = self.git(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            bail!("Unknown revision: {}", rev);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let output = self.git(&["merge-base", "--is-ancestor", ancestor, descendant])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => bail!(
                "git merge-base failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }

    fn is_clean(&self) -> Result<bool> {
        let status = self.git_stdout(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(status.is_empty())
    }

    fn diff_hunks(&self, from: &str, to: &str, paths: &[String]) -> Result<Vec<Hunk>> {
        self.diff_between(from, to, paths)
    }

    fn worktree_path(&self, baseline: &str) -> PathBuf {
        self.baseline_worktree_path(baseline)
    }

    fn create_worktree(&self, baseline: &str) -> Result<PathBuf> {
        self.add_baseline_worktree(baseline)
    }

    fn remove_worktree(&self, baseline: &str) -> Result<()> {
        self.remove_baseline_worktree(baseline)
    }

    fn add_note(&self, commit: &str, body: &str) -> Result<()> {
        self.write_note(commit, body)
    }
}
