use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::Finding;
use crate::error::StetError;
use crate::git::Vcs;
use crate::history::HistoryRecord;
use crate::session::{RunOptions, Session, SessionLock, new_session_id};

use super::stream::{self, EventSink, StreamEvent};
use super::{Orchestrator, captured, partition};

/// Parameters of [`Orchestrator::start`]
#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    /// Baseline revision; empty means `HEAD`
    pub reference: String,
    pub dry_run: bool,
    /// Start even with uncommitted tracked changes
    pub allow_dirty: bool,
    /// Restrict the review to these repository paths
    pub paths: Vec<String>,
    /// Options to persist for the session, over configured defaults
    pub options: RunOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartOutcome {
    pub session_id: String,
    pub baseline: String,
    pub head: String,
    pub hunks_reviewed: usize,
    pub findings: Vec<Finding>,
    /// Baseline checkout; None when baseline equals HEAD
    pub worktree: Option<PathBuf>,
}

/// Removes the baseline worktree on drop unless disarmed.
struct WorktreeGuard<'a> {
    vcs: &'a dyn Vcs,
    baseline: String,
    armed: bool,
}

impl<'a> WorktreeGuard<'a> {
    fn new(vcs: &'a dyn Vcs, baseline: &str) -> Self {
        Self {
            vcs,
            baseline: baseline.to_string(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for WorktreeGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.vcs.remove_worktree(&self.baseline) {
            tracing::warn!("Failed to clean up review worktree: {:#}", e);
        }
    }
}

impl Orchestrator {
    /// Remove the worktree of a replaced session anchored elsewhere.
    fn drop_stale_worktree(&self, previous: &Session, baseline: &str) {
        if !previous.exists() || previous.baseline_ref == baseline {
            return;
        }
        if let Err(e) = self.vcs.remove_worktree(&previous.baseline_ref) {
            tracing::warn!("Failed to remove previous review worktree: {:#}", e);
        }
    }

    /// Begin a review session anchored at `request.reference`.
    pub async fn start(
        &self,
        request: &StartRequest,
        mut sink: Option<&mut EventSink<'_>>,
    ) -> Result<StartOutcome> {
        if !self.vcs.is_clean()? {
            if !request.allow_dirty {
                return Err(StetError::DirtyWorktree.into());
            }
            tracing::warn!("Working tree has uncommitted changes; they are not part of the review");
        }

        let lock = SessionLock::acquire(&self.state_dir)?;
        let previous = self.load_session()?;

        let reference = match request.reference.trim() {
            "" => "HEAD",
            r => r,
        };
        let baseline = self
            .vcs
            .resolve_commit(reference)
            .with_context(|| format!("Could not resolve baseline {}", reference))?;
        let head = self.resolve_head()?;
        self.ensure_ancestor(&baseline, &head)?;

        let options = self.effective_options(&RunOptions::default(), &request.options);
        let mut session = Session {
            session_id: new_session_id(),
            baseline_ref: baseline.clone(),
            options: options.clone(),
            ..Default::default()
        };

        if baseline == head {
            self.drop_stale_worktree(&previous, &baseline);
            session.last_reviewed_at = head.clone();
            session.save(&self.state_dir)?;
            lock.release()?;
            tracing::info!(baseline = %baseline, "Baseline is HEAD; nothing to review");
            stream::emit(&mut sink, StreamEvent::Done);
            return Ok(StartOutcome {
                session_id: session.session_id,
                baseline,
                head,
                hunks_reviewed: 0,
                findings: Vec::new(),
                worktree: None,
            });
        }

        // Validates strictness before anything is created.
        let pass = self.review_pass(request.dry_run, &options, &session)?;
        if !request.dry_run {
            self.preflight().await?;
        }

        self.drop_stale_worktree(&previous, &baseline);
        let worktree = self.vcs.create_worktree(&baseline)?;
        let guard = WorktreeGuard::new(self.vcs.as_ref(), &baseline);

        session.save(&self.state_dir)?;

        let scope = partition(self.vcs.as_ref(), &baseline, &head, "", &request.paths)?;
        stream::emit(
            &mut sink,
            StreamEvent::Progress {
                msg: format!("Reviewing {} hunks", scope.to_review.len()),
            },
        );
        let output = self.review_hunks(&scope.to_review, &pass, &mut sink).await?;

        for (id, raw) in &output.contexts {
            session.record_prompt_context(id, raw);
        }
        session.findings = output.findings.clone();
        session.last_usage = captured(output.usage);
        session.last_reviewed_at = head.clone();
        session.save(&self.state_dir)?;
        guard.disarm();

        self.append_history(&HistoryRecord {
            diff_ref: baseline.clone(),
            review_output: output.findings.clone(),
            run_config: Some(self.run_config(&options)),
            usage: captured(output.usage),
            ..Default::default()
        })?;
        lock.release()?;

        tracing::info!(
            baseline = %baseline,
            head = %head,
            findings = output.findings.len(),
            "Started review"
        );
        stream::emit(&mut sink, StreamEvent::Done);

        Ok(StartOutcome {
            session_id: session.session_id,
            baseline,
            head,
            hunks_reviewed: scope.to_review.len(),
            findings: output.findings,
            worktree: Some(worktree),
        })
    }
}
