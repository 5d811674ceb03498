//! stet - local-first code review with an LLM
//!
//! stet reviews the diff between a baseline commit and `HEAD` hunk by hunk
//! with a locally hosted model, and keeps the findings in a per-repository
//! session so later passes only look at what changed.
//!
//! ## Lifecycle
//!
//! 1. **start** pins a baseline, checks out a worktree for it and reviews
//!    every hunk up to `HEAD`.
//! 2. **run** reviews only hunks changed since the last pass, merges new
//!    findings and auto-dismisses findings that were fixed.
//! 3. **dismiss** hides a finding and remembers it as a negative example
//!    for future prompts.
//! 4. **finish** removes the worktree and attaches a summary note to `HEAD`
//!    under `refs/notes/stet`.
//!
//! All state lives in `<repo>/.review/`: `session.json`, the `lock` file and
//! the rotated `history.jsonl` log.

pub mod config;
pub mod domain;
pub mod error;
pub mod findings;
pub mod git;
pub mod history;
pub mod ollama;
pub mod review;
pub mod session;

pub use domain::*;
pub use error::StetError;
