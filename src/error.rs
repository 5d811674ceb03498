//! Typed error conditions surfaced to callers.
//!
//! Orchestration code returns `anyhow::Result` and attaches one of these as
//! context, so callers can match on the condition with [`StetError::find`]
//! while the technical cause stays reachable through `err.chain()`.

/// Minimum number of characters accepted when resolving a finding ID prefix.
pub const MIN_FINDING_ID_PREFIX: usize = 4;

/// Conditions callers may want to handle programmatically
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StetError {
    #[error("another review is in progress for this repository")]
    Locked,

    #[error("no active review session")]
    NoSession,

    #[error("working tree has uncommitted changes")]
    DirtyWorktree,

    #[error("baseline is not an ancestor of HEAD")]
    BaselineNotAncestor,

    #[error("a worktree for this baseline already exists")]
    WorktreeExists,

    #[error("reviewer is unreachable")]
    ReviewerUnreachable,

    #[error("finding ID must be at least {MIN_FINDING_ID_PREFIX} characters")]
    FindingIdTooShort,

    #[error("finding ID {0:?} is ambiguous")]
    FindingIdAmbiguous(String),

    #[error("finding ID {0:?} not found")]
    FindingIdNotFound(String),

    #[error("invalid strictness {0:?} (expected strict, default or lenient, optionally with +)")]
    InvalidStrictness(String),

    #[error("invalid finding: {0}")]
    InvalidFinding(String),
}

impl StetError {
    /// Find the first typed condition anywhere in an error chain.
    pub fn find(err: &anyhow::Error) -> Option<&StetError> {
        err.downcast_ref::<StetError>()
            .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<StetError>()))
    }

    /// Whether `err` carries this condition.
    pub fn is_in(&self, err: &anyhow::Error) -> bool {
        Self::find(err) == Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn condition_is_found_through_context() {
        let err = Err::<(), _>(anyhow::anyhow!("connection refused"))
            .context(StetError::ReviewerUnreachable)
            .unwrap_err();

        assert_eq!(StetError::find(&err), Some(&StetError::ReviewerUnreachable));
        assert_eq!(err.to_string(), "reviewer is unreachable");
        assert!(
            err.chain().any(|c| c.to_string() == "connection refused"),
            "technical cause should stay in the chain"
        );
    }

    #[test]
    fn condition_is_found_when_wrapped_by_message() {
        let err = anyhow::Error::new(StetError::Locked).context("could not start review");
        assert!(StetError::Locked.is_in(&err));
        assert!(!StetError::NoSession.is_in(&err));
    }
}
