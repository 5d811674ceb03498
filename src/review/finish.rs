use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::usage_capture_enabled;
use crate::domain::HunkStats;
use crate::history::{HistoryRecord, UserAction};

use super::Orchestrator;

/// Summary attached to HEAD as a git note when a session finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishNote {
    pub session_id: String,
    pub baseline_sha: String,
    pub head_sha: String,
    pub findings_count: usize,
    pub dismissals_count: usize,
    pub tool_version: String,
    /// RFC 3339 UTC
    pub finished_at: String,
    pub hunks_reviewed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub chars_added: usize,
    pub chars_deleted: usize,
    pub chars_reviewed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_duration_ns: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishOutcome {
    pub note: FinishNote,
}

impl Orchestrator {
    /// Close the session: drop the worktree, record history and write the note.
    ///
    /// The session file stays on disk. Finishing twice is safe.
    pub async fn finish(&self) -> Result<FinishOutcome> {
        self.require_session()?;
        let (lock, session) = self.lock_session()?;
        let baseline = session.baseline_ref.clone();

        self.vcs
            .remove_worktree(&baseline)
            .context("Failed to remove review worktree")?;

        let head = self.resolve_head()?;
        let mut stats = HunkStats::default();
        for hunk in self.vcs.diff_hunks(&baseline, &head, &[])? {
            stats += hunk.stats();
        }

        let finished_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let capture = usage_capture_enabled();
        let usage = session.last_usage.filter(|_| capture);

        if !session.findings.is_empty() {
            self.append_history(&HistoryRecord {
                diff_ref: baseline.clone(),
                review_output: session.findings.clone(),
                user_action: UserAction {
                    dismissed_ids: session.dismissed_ids.iter().cloned().collect(),
                    finished_at: Some(finished_at.clone()),
                    ..Default::default()
                },
                run_config: Some(self.run_config(&session.options)),
                usage,
            })?;
        }

        let mut note = FinishNote {
            session_id: session.session_id.clone(),
            baseline_sha: baseline,
            head_sha: head.clone(),
            findings_count: session.findings.len(),
            dismissals_count: session.dismissed_ids.len(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            finished_at,
            hunks_reviewed: stats.hunks,
            lines_added: stats.lines_added,
            lines_removed: stats.lines_removed,
            chars_added: stats.chars_added,
            chars_deleted: stats.chars_deleted,
            chars_reviewed: stats.chars_reviewed,
            ..Default::default()
        };
        if capture {
            note.model = self.model_name();
            let usage = session.last_usage.unwrap_or_default();
            note.prompt_tokens = Some(usage.prompt_tokens);
            note.completion_tokens = Some(usage.completion_tokens);
            note.eval_duration_ns = Some(usage.eval_duration_ns);
        }

        let body = serde_json::to_string(&note).context("Failed to serialize review note")?;
        self.vcs
            .add_note(&head, &body)
            .context("Failed to write review note")?;
        lock.release()?;

        tracing::info!(
            head = %head,
            findings = note.findings_count,
            dismissed = note.dismissals_count,
            "Finished review"
        );
        Ok(FinishOutcome { note })
    }
}
