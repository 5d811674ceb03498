//! Worktree operations for GitManager

use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};

use super::GitManager;
use crate::error::StetError;

/// Length of the baseline SHA prefix used to name worktree directories
const WORKTREE_NAME_LEN: usize = 12;

impl GitManager {
    pub(super) fn baseline_worktree_path(&self, baseline: &str) -> PathBuf {
        let name: String = baseline.trim().chars().take(WORKTREE_NAME_LEN).collect();
        self.worktrees_dir.join(name)
    }

    /// Check out `baseline` in a detached worktree.
    pub(super) fn add_baseline_worktree(&self, baseline: &str) -> Result<PathBuf> {
        let worktree_path = self.baseline_worktree_path(baseline);
        if worktree_path.exists() {
            return Err(StetError::WorktreeExists)
                .with_context(|| format!("Worktree path {} is in use", worktree_path.display()));
        }

        std::fs::create_dir_all(&self.worktrees_dir).with_context(|| {
            format!(
                "Failed to create worktree directory: {}",
                self.worktrees_dir.display()
            )
        })?;

        let worktree_path_str = path_str(&worktree_path)?;
        let output = self.git(&["worktree", "add", "--detach", worktree_path_str, baseline])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("already exists") || stderr.contains("already registered") {
                return Err(anyhow!(stderr.trim().to_string()).context(StetError::WorktreeExists));
            }
            bail!("Failed to create worktree: {}", stderr.trim());
        }

        tracing::debug!(path = %worktree_path.display(), baseline, "Created review worktree");
        Ok(worktree_path)
    }

    /// Remove the worktree for `baseline` if it exists.
    pub(super) fn remove_baseline_worktree(&self, baseline: &str) -> Result<()> {
        let worktree_path = self.baseline_worktree_path(baseline);

        if worktree_path.exists() {
            let worktree_path_str = path_str(&worktree_path)?;
            let output = self.git(&["worktree", "remove", "--force", worktree_path_str])?;

            if !output.status.success() {
                tracing::warn!(
                    "Failed to remove worktree: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                std::fs::remove_dir_all(&worktree_path).with_context(|| {
                    format!("Failed to remove worktree directory: {}", worktree_path.display())
                })?;
            }
        }

        // Drop registrations whose directories are already gone.
        let output = self.git(&["worktree", "prune"])?;
        if !output.status.success() {
            tracing::warn!(
                "Failed to prune worktrees: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("Worktree path contains invalid UTF-8"))
}
