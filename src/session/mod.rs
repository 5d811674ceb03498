//! Persistent per-repository review state.
//!
//! The session lives in `<state_dir>/session.json` and is only written by
//! the holder of the [`SessionLock`].

mod lock;

pub use lock::{LOCK_FILE, SessionLock};

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Finding, Usage};

pub const SESSION_FILE: &str = "session.json";

/// Raw hunk text stored per finding is cut at this many bytes
pub const PROMPT_CONTEXT_LIMIT: usize = 4096;

pub const TRUNCATED_MARKER: &str = "[truncated]";

/// A dismissed finding kept as a negative example for later prompts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptShadow {
    pub finding_id: String,
    #[serde(default)]
    pub prompt_context: String,
}

/// Run options remembered between invocations.
///
/// `None` means "not set"; a zero value is a real setting (for example
/// `rag_symbol_max_tokens = 0` disables the cap).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strictness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_symbol_max_definitions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_symbol_max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitpicky: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

impl RunOptions {
    /// Fields set here win; unset ones come from `base`.
    pub fn merged_over(&self, base: &RunOptions) -> RunOptions {
        RunOptions {
            strictness: self.strictness.clone().or_else(|| base.strictness.clone()),
            rag_symbol_max_definitions: self
                .rag_symbol_max_definitions
                .or(base.rag_symbol_max_definitions),
            rag_symbol_max_tokens: self.rag_symbol_max_tokens.or(base.rag_symbol_max_tokens),
            nitpicky: self.nitpicky.or(base.nitpicky),
            context_limit: self.context_limit.or(base.context_limit),
            num_ctx: self.num_ctx.or(base.num_ctx),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub session_id: String,

    /// Commit the review is anchored to; empty when no session exists
    #[serde(default)]
    pub baseline_ref: String,

    /// Commit of the last successful review pass
    #[serde(default)]
    pub last_reviewed_at: String,

    #[serde(default)]
    pub dismissed_ids: BTreeSet<String>,

    #[serde(default)]
    pub findings: Vec<Finding>,

    /// Raw hunk text that produced each finding, keyed by finding ID
    #[serde(default)]
    pub finding_prompt_context: BTreeMap<String, String>,

    #[serde(default)]
    pub prompt_shadows: Vec<PromptShadow>,

    #[serde(flatten)]
    pub options: RunOptions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_usage: Option<Usage>,
}

/// Path of the session file inside `state_dir`
pub fn session_path(state_dir: &Path) -> PathBuf {
    state_dir.join(SESSION_FILE)
}

/// Fresh random 128-bit session ID in hex
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Cut `raw` to [`PROMPT_CONTEXT_LIMIT`] bytes on a char boundary and mark
/// the cut.
pub fn truncate_prompt_context(raw: &str) -> String {
    if raw.len() <= PROMPT_CONTEXT_LIMIT {
        return raw.to_string();
    }
    let mut cut = PROMPT_CONTEXT_LIMIT;
    while !raw.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}\n{}", &raw[..cut], TRUNCATED_MARKER)
}

impl Session {
    /// Load the session, or an empty one when the file does not exist.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = session_path(state_dir);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session file: {}", path.display()));
            }
        };

        serde_json::from_str(&content).with_context(|| {
            format!(
                "Session file {} is corrupted; inspect or remove it",
                path.display()
            )
        })
    }

    /// Write the session atomically (temp file, sync, rename).
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs::create_dir_all(state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;

        let path = session_path(state_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize session")?;

        let temp_path = path.with_extension("json.tmp");
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        temp_file
            .write_all(content.as_bytes())
            .context("Failed to write session")?;
        temp_file.sync_all().context("Failed to sync session file")?;
        drop(temp_file);

        fs::rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace session file: {}", path.display()))?;
        Ok(())
    }

    /// Whether a review has been started
    pub fn exists(&self) -> bool {
        !self.baseline_ref.is_empty()
    }

    pub fn is_dismissed(&self, id: &str) -> bool {
        self.dismissed_ids.contains(id)
    }

    /// Findings not dismissed, in stored order
    pub fn active_findings(&self) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| !self.is_dismissed(&f.id))
            .collect()
    }

    pub fn finding(&self, id: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.id == id)
    }

    /// Findings whose locations were dismissed, used to skip hunks
    pub fn dismissed_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| self.is_dismissed(&f.id))
    }

    pub fn record_prompt_context(&mut self, id: &str, raw: &str) {
        self.finding_prompt_context
            .insert(id.to_string(), truncate_prompt_context(raw));
    }

    /// Add a prompt shadow for `id` when its context was recorded and no
    /// shadow exists yet.
    pub fn add_prompt_shadow(&mut self, id: &str) {
        if self.prompt_shadows.iter().any(|s| s.finding_id == id) {
            return;
        }
        let Some(prompt_context) = self.finding_prompt_context.get(id).cloned() else {
            return;
        };
        self.prompt_shadows.push(PromptShadow {
            finding_id: id.to_string(),
            prompt_context,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn finding(id: &str) -> Finding {
        Finding {
            id: id.to_string(),
            file: "a.rs".to_string(),
            line: 1,
            confidence: 1.0,
            message: "m".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_file_loads_empty_session() {
        let temp = TempDir::new().unwrap();
        let session = Session::load(temp.path()).unwrap();
        assert_eq!(session, Session::default());
        assert!(!session.exists());
    }

    #[test]
    fn save_then_load_keeps_state() {
        let temp = TempDir::new().unwrap();
        let state_dir = temp.path().join(".review");

        let mut session = Session {
            session_id: new_session_id(),
            baseline_ref: "abc".to_string(),
            findings: vec![finding("f1"), finding("f2")],
            options: RunOptions {
                rag_symbol_max_tokens: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        session.dismissed_ids.insert("f1".to_string());
        session.save(&state_dir).unwrap();

        let loaded = Session::load(&state_dir).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.options.rag_symbol_max_tokens, Some(0));
        assert_eq!(loaded.options.rag_symbol_max_definitions, None);
        assert_eq!(loaded.active_findings().len(), 1);
        assert!(!state_dir.join("session.json.tmp").exists());
    }

    #[test]
    fn session_file_is_indented_and_omits_unset_options() {
        let temp = TempDir::new().unwrap();
        Session::default().save(temp.path()).unwrap();

        let content = fs::read_to_string(session_path(temp.path())).unwrap();
        assert!(content.contains("\n  \"baseline_ref\""));
        assert!(!content.contains("strictness"));
    }

    #[test]
    fn corrupted_session_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(session_path(temp.path()), "{ nope").unwrap();

        let err = Session::load(temp.path()).unwrap_err();
        assert!(err.to_string().contains("inspect or remove"));
    }

    #[test]
    fn set_options_win_over_base() {
        let base = RunOptions {
            strictness: Some("default".to_string()),
            nitpicky: Some(false),
            rag_symbol_max_tokens: Some(500),
            ..Default::default()
        };
        let overrides = RunOptions {
            nitpicky: Some(true),
            rag_symbol_max_tokens: Some(0),
            ..Default::default()
        };

        let merged = overrides.merged_over(&base);
        assert_eq!(merged.strictness.as_deref(), Some("default"));
        assert_eq!(merged.nitpicky, Some(true));
        assert_eq!(merged.rag_symbol_max_tokens, Some(0));
        assert_eq!(merged.num_ctx, None);
    }

    #[test]
    fn session_ids_are_128_bit_hex() {
        let id = new_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_session_id());
    }

    #[test]
    fn prompt_context_is_truncated_on_char_boundary() {
        let short = "small hunk";
        assert_eq!(truncate_prompt_context(short), short);

        let long = "é".repeat(PROMPT_CONTEXT_LIMIT);
        let truncated = truncate_prompt_context(&long);
        assert!(truncated.ends_with(TRUNCATED_MARKER));
        assert!(truncated.len() <= PROMPT_CONTEXT_LIMIT + TRUNCATED_MARKER.len() + 1);
    }

    #[test]
    fn prompt_shadow_uses_recorded_context_once() {
        let mut session = Session::default();
        session.record_prompt_context("f1", "@@ -1 +1 @@\n+x\n");
        session.add_prompt_shadow("f1");
        session.add_prompt_shadow("f1");

        assert_eq!(session.prompt_shadows.len(), 1);
        assert_eq!(session.prompt_shadows[0].prompt_context, "@@ -1 +1 @@\n+x\n");
    }

    #[test]
    fn prompt_shadow_needs_recorded_context() {
        let mut session = Session::default();
        session.add_prompt_shadow("unknown");
        assert!(session.prompt_shadows.is_empty());
    }
}
