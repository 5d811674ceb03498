//! Version-control access for the review pipeline

mod manager;

pub use manager::{GitManager, NOTES_REF, find_git_root, parse_unified_diff};

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::Hunk;

/// Repository operations the orchestrator needs.
///
/// Commit arguments are anything the backend can resolve (refs, SHAs);
/// returned commit IDs are full SHAs.
pub trait Vcs: Send + Sync {
    fn repo_root(&self) -> &Path;

    /// Resolve `rev` to a full commit ID.
    fn resolve_commit(&self, rev: &str) -> Result<String>;

    /// Whether `ancestor` is reachable from `descendant` (true when equal).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Whether tracked files have no uncommitted changes.
    fn is_clean(&self) -> Result<bool>;

    /// Hunks of `diff(from, to)`, optionally restricted to `paths`.
    fn diff_hunks(&self, from: &str, to: &str, paths: &[String]) -> Result<Vec<Hunk>>;

    /// Where the worktree for `baseline` lives.
    fn worktree_path(&self, baseline: &str) -> PathBuf;

    /// Check out `baseline` in a detached worktree, failing with
    /// `WorktreeExists` when one is already there.
    fn create_worktree(&self, baseline: &str) -> Result<PathBuf>;

    /// Remove the worktree for `baseline`; a missing worktree is not an error.
    fn remove_worktree(&self, baseline: &str) -> Result<()>;

    /// Attach `body` as the review note on `commit`, replacing any existing one.
    fn add_note(&self, commit: &str, body: &str) -> Result<()>;
}
