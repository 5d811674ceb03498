use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use crate::domain::{Finding, Usage};
use crate::session::RunOptions;

use super::Orchestrator;

/// Read-only summary of the current session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub session_id: String,
    pub baseline_ref: String,
    pub last_reviewed_at: String,
    pub findings: usize,
    pub dismissed: usize,
    pub active: usize,
    pub options: RunOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_usage: Option<Usage>,
    /// Baseline checkout, when it still exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree: Option<PathBuf>,
}

impl Orchestrator {
    pub fn status(&self) -> Result<StatusReport> {
        let session = self.require_session()?;
        let worktree = Some(self.vcs.worktree_path(&session.baseline_ref)).filter(|p| p.exists());

        Ok(StatusReport {
            findings: session.findings.len(),
            dismissed: session.dismissed_ids.len(),
            active: session.active_findings().len(),
            session_id: session.session_id,
            baseline_ref: session.baseline_ref,
            last_reviewed_at: session.last_reviewed_at,
            options: session.options,
            last_usage: session.last_usage,
            worktree,
        })
    }

    /// Findings not dismissed, in stored order
    pub fn active_findings(&self) -> Result<Vec<Finding>> {
        let session = self.require_session()?;
        Ok(session.active_findings().into_iter().cloned().collect())
    }
}
