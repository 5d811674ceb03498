//! Review orchestration.
//!
//! [`Orchestrator`] ties the other modules together: it holds the session
//! lock, reads and writes the session, partitions the diff, runs the
//! per-hunk loop and records history. Session and history never see each
//! other; every operation here decides what goes into both.

mod auto_dismiss;
mod dismiss;
mod finish;
mod hunk_loop;
mod prompt;
mod reviewer;
mod run;
mod scope;
mod start;
mod status;
mod stream;

pub use auto_dismiss::addressed_findings;
pub use dismiss::DismissOutcome;
pub use finish::{FinishNote, FinishOutcome};
pub use prompt::{DefaultPromptBuilder, PromptBuilder, PromptContext};
pub use reviewer::{Generation, Prompt, Reviewer};
pub use run::{RunOutcome, RunRequest};
pub use scope::{Partition, partition, skip_dismissed};
pub use start::{StartOutcome, StartRequest};
pub use status::StatusReport;
pub use stream::{EventSink, StreamEvent};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use crate::config::{Config, usage_capture_enabled};
use crate::domain::Usage;
use crate::error::StetError;
use crate::findings::Strictness;
use crate::git::Vcs;
use crate::history::{self, HistoryRecord, RunConfigSnapshot};
use crate::session::{RunOptions, Session, SessionLock};

use hunk_loop::ReviewPass;

/// Defaults and limits an orchestrator applies to every operation
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSettings {
    /// Run options used where neither the request nor the session sets one
    pub options: RunOptions,
    /// Active history file cap; 0 disables rotation
    pub history_max_records: usize,
    pub suppression_enabled: bool,
    pub suppression_history_records: usize,
    pub suppression_max_examples: usize,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ReviewSettings {
    fn from(config: &Config) -> Self {
        Self {
            options: RunOptions {
                strictness: Some(config.strictness.clone()),
                rag_symbol_max_definitions: config.rag_symbol_max_definitions,
                rag_symbol_max_tokens: config.rag_symbol_max_tokens,
                nitpicky: Some(config.nitpicky),
                context_limit: Some(config.context_limit),
                num_ctx: Some(config.context_limit),
            },
            history_max_records: config.history_max_records,
            suppression_enabled: config.suppression_enabled,
            suppression_history_records: config.suppression_history_records,
            suppression_max_examples: config.suppression_max_examples,
        }
    }
}

/// Runs review operations against one repository and state directory
pub struct Orchestrator {
    vcs: Arc<dyn Vcs>,
    reviewer: Option<Arc<dyn Reviewer>>,
    prompt_builder: Arc<dyn PromptBuilder>,
    state_dir: PathBuf,
    settings: ReviewSettings,
}

impl Orchestrator {
    /// Orchestrator without a reviewer; only dry runs can review hunks.
    pub fn new(vcs: Arc<dyn Vcs>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            vcs,
            reviewer: None,
            prompt_builder: Arc::new(DefaultPromptBuilder),
            state_dir: state_dir.into(),
            settings: ReviewSettings::default(),
        }
    }

    pub fn with_reviewer(mut self, reviewer: Arc<dyn Reviewer>) -> Self {
        self.reviewer = Some(reviewer);
        self
    }

    pub fn with_prompt_builder(mut self, prompt_builder: Arc<dyn PromptBuilder>) -> Self {
        self.prompt_builder = prompt_builder;
        self
    }

    pub fn with_settings(mut self, settings: ReviewSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    /// The session as stored, which may be empty
    pub fn load_session(&self) -> Result<Session> {
        Session::load(&self.state_dir)
    }

    fn reviewer(&self) -> Result<&dyn Reviewer> {
        self.reviewer
            .as_deref()
            .ok_or_else(|| anyhow!("no reviewer configured").context(StetError::ReviewerUnreachable))
    }

    /// Probe the reviewer; every failure carries `ReviewerUnreachable`.
    async fn preflight(&self) -> Result<()> {
        match self.reviewer()?.check().await {
            Ok(()) => Ok(()),
            Err(e) if StetError::ReviewerUnreachable.is_in(&e) => Err(e),
            Err(e) => Err(e.context(StetError::ReviewerUnreachable)),
        }
    }

    fn model_name(&self) -> Option<String> {
        self.reviewer.as_ref().map(|r| r.model().to_string())
    }

    fn require_session(&self) -> Result<Session> {
        let session = self.load_session()?;
        if !session.exists() {
            return Err(StetError::NoSession.into());
        }
        Ok(session)
    }

    /// Take the lock, then re-read the session it guards.
    fn lock_session(&self) -> Result<(SessionLock, Session)> {
        let lock = SessionLock::acquire(&self.state_dir)?;
        let session = self.require_session()?;
        Ok((lock, session))
    }

    fn resolve_head(&self) -> Result<String> {
        self.vcs
            .resolve_commit("HEAD")
            .context("Could not resolve HEAD")
    }

    fn ensure_ancestor(&self, baseline: &str, head: &str) -> Result<()> {
        if !self.vcs.is_ancestor(baseline, head)? {
            return Err(anyhow!("{} is not an ancestor of {}", baseline, head)
                .context(StetError::BaselineNotAncestor));
        }
        Ok(())
    }

    /// Request options over session options over configured defaults
    fn effective_options(&self, persisted: &RunOptions, overrides: &RunOptions) -> RunOptions {
        overrides.merged_over(&persisted.merged_over(&self.settings.options))
    }

    fn review_pass(&self, dry_run: bool, options: &RunOptions, session: &Session) -> Result<ReviewPass> {
        let strictness = Strictness::resolve(options.strictness.as_deref().unwrap_or(""))?
            .with_nitpicky(options.nitpicky.unwrap_or(false));

        let suppression_examples = if dry_run || !self.settings.suppression_enabled {
            Vec::new()
        } else {
            history::suppression_examples(
                &self.state_dir,
                self.settings.suppression_history_records,
                self.settings.suppression_max_examples,
            )
        };

        Ok(ReviewPass {
            dry_run,
            strictness,
            prompt: PromptContext {
                nitpicky: options.nitpicky.unwrap_or(false),
                suppression_examples,
                shadows: session.prompt_shadows.clone(),
                rag_symbol_max_definitions: options.rag_symbol_max_definitions,
                rag_symbol_max_tokens: options.rag_symbol_max_tokens,
            },
        })
    }

    fn run_config(&self, options: &RunOptions) -> RunConfigSnapshot {
        RunConfigSnapshot {
            model: self.model_name(),
            strictness: options.strictness.clone(),
            rag_symbol_max_definitions: options.rag_symbol_max_definitions,
            rag_symbol_max_tokens: options.rag_symbol_max_tokens,
            nitpicky: options.nitpicky,
        }
    }

    fn append_history(&self, record: &HistoryRecord) -> Result<()> {
        history::append(&self.state_dir, record, self.settings.history_max_records)
            .context("Failed to record review history")
    }
}

/// `usage` unless capture is switched off in the environment
fn captured(usage: Usage) -> Option<Usage> {
    usage_capture_enabled().then_some(usage)
}
