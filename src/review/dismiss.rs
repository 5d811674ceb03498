use anyhow::Result;

use crate::findings::resolve_finding_id;
use crate::history::{Dismissal, DismissalReason, HistoryRecord, UserAction};

use super::Orchestrator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissOutcome {
    /// Full ID the prefix resolved to
    pub id: String,
    pub already_dismissed: bool,
}

impl Orchestrator {
    /// Dismiss the finding whose ID starts with `id_or_prefix`.
    pub fn dismiss(
        &self,
        id_or_prefix: &str,
        reason: Option<DismissalReason>,
    ) -> Result<DismissOutcome> {
        self.require_session()?;
        let (lock, mut session) = self.lock_session()?;

        let id = resolve_finding_id(session.findings.iter().map(|f| f.id.as_str()), id_or_prefix)?;
        if session.is_dismissed(&id) {
            return Ok(DismissOutcome {
                id,
                already_dismissed: true,
            });
        }

        session.dismissed_ids.insert(id.clone());
        session.add_prompt_shadow(&id);
        session.save(&self.state_dir)?;

        let diff_ref = if session.last_reviewed_at.is_empty() {
            session.baseline_ref.clone()
        } else {
            session.last_reviewed_at.clone()
        };
        self.append_history(&HistoryRecord {
            diff_ref,
            review_output: session.finding(&id).cloned().into_iter().collect(),
            user_action: UserAction {
                dismissed_ids: vec![id.clone()],
                dismissals: vec![Dismissal {
                    finding_id: id.clone(),
                    reason,
                }],
                ..Default::default()
            },
            ..Default::default()
        })?;
        lock.release()?;

        tracing::info!(id = %id, reason = ?reason, "Dismissed finding");
        Ok(DismissOutcome {
            id,
            already_dismissed: false,
        })
    }
}
