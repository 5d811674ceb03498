use std::collections::HashSet;

use anyhow::Result;

use crate::domain::Finding;
use crate::history::{Dismissal, DismissalReason, HistoryRecord, UserAction};
use crate::session::RunOptions;

use super::stream::{self, EventSink, StreamEvent};
use super::{Orchestrator, addressed_findings, captured, partition, skip_dismissed};

/// Parameters of [`Orchestrator::run`]
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub dry_run: bool,
    /// Review the whole baseline→HEAD diff, including dismissed locations
    pub force_full_review: bool,
    /// Make this run's findings the session's only findings
    pub replace_findings: bool,
    pub paths: Vec<String>,
    /// Overrides for the session's persisted options
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOutcome {
    pub head: String,
    pub hunks_reviewed: usize,
    /// Hunks left out because they overlap dismissed findings
    pub hunks_skipped: usize,
    /// Findings added to the session by this run
    pub new_findings: Vec<Finding>,
    /// IDs dismissed because the run no longer reported them
    pub auto_dismissed: Vec<String>,
}

impl Orchestrator {
    /// Review what changed since the last pass and merge the results.
    pub async fn run(
        &self,
        request: &RunRequest,
        mut sink: Option<&mut EventSink<'_>>,
    ) -> Result<RunOutcome> {
        self.require_session()?;
        let (lock, mut session) = self.lock_session()?;

        let head = self.resolve_head()?;
        let baseline = session.baseline_ref.clone();
        self.ensure_ancestor(&baseline, &head)?;

        let options = self.effective_options(&session.options, &request.options);
        let pass = self.review_pass(request.dry_run, &options, &session)?;

        let since = if request.force_full_review {
            String::new()
        } else {
            session.last_reviewed_at.clone()
        };
        let scope = partition(self.vcs.as_ref(), &baseline, &head, &since, &request.paths)?;
        let (to_review, hunks_skipped) = if request.force_full_review {
            (scope.to_review, 0)
        } else {
            skip_dismissed(scope.to_review, session.dismissed_findings())
        };
        if hunks_skipped > 0 {
            tracing::info!(skipped = hunks_skipped, "Skipping hunks with dismissed findings");
        }

        let mut outcome = RunOutcome {
            head: head.clone(),
            hunks_reviewed: to_review.len(),
            hunks_skipped,
            ..Default::default()
        };

        if to_review.is_empty() {
            session.last_reviewed_at = head;
            session.options = options;
            session.save(&self.state_dir)?;
            lock.release()?;
            tracing::info!("Nothing new to review");
            stream::emit(&mut sink, StreamEvent::Done);
            return Ok(outcome);
        }

        if !request.dry_run {
            self.preflight().await?;
        }
        let output = self.review_hunks(&to_review, &pass, &mut sink).await?;
        let diff_ref = if since.is_empty() { baseline } else { since };

        let mut addressed = Vec::new();
        if request.replace_findings {
            let new_ids: HashSet<&str> = output.findings.iter().map(|f| f.id.as_str()).collect();
            session
                .finding_prompt_context
                .retain(|id, _| new_ids.contains(id.as_str()));
            session.findings = output.findings.clone();
            session.dismissed_ids.clear();
            outcome.new_findings = output.findings.clone();
        } else {
            let new_ids: HashSet<&str> = output.findings.iter().map(|f| f.id.as_str()).collect();
            addressed = addressed_findings(
                &session.findings,
                &session.dismissed_ids,
                &to_review,
                &new_ids,
            );
            for finding in &addressed {
                session.dismissed_ids.insert(finding.id.clone());
            }

            let mut known: HashSet<String> = session.findings.iter().map(|f| f.id.clone()).collect();
            for finding in &output.findings {
                if known.insert(finding.id.clone()) {
                    session.findings.push(finding.clone());
                    outcome.new_findings.push(finding.clone());
                }
            }
        }

        for (id, raw) in &output.contexts {
            session.record_prompt_context(id, raw);
        }
        session.last_usage = captured(output.usage);
        session.last_reviewed_at = head;
        session.options = options.clone();
        session.save(&self.state_dir)?;

        if !addressed.is_empty() {
            outcome.auto_dismissed = addressed.iter().map(|f| f.id.clone()).collect();
            self.append_history(&HistoryRecord {
                diff_ref: diff_ref.clone(),
                user_action: UserAction {
                    dismissed_ids: outcome.auto_dismissed.clone(),
                    dismissals: addressed
                        .iter()
                        .map(|f| Dismissal {
                            finding_id: f.id.clone(),
                            reason: Some(DismissalReason::AlreadyCorrect),
                        })
                        .collect(),
                    ..Default::default()
                },
                review_output: addressed,
                ..Default::default()
            })?;
        }

        self.append_history(&HistoryRecord {
            diff_ref,
            review_output: output.findings,
            user_action: UserAction {
                replace_findings: request.replace_findings,
                ..Default::default()
            },
            run_config: Some(self.run_config(&options)),
            usage: captured(output.usage),
        })?;
        lock.release()?;

        tracing::info!(
            reviewed = outcome.hunks_reviewed,
            new = outcome.new_findings.len(),
            auto_dismissed = outcome.auto_dismissed.len(),
            "Review pass complete"
        );
        stream::emit(&mut sink, StreamEvent::Done);
        Ok(outcome)
    }
}
