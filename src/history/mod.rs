//! Append-only review history.
//!
//! Each record is one JSON line in `<state_dir>/history.jsonl`. When the
//! active file grows past its record cap the oldest lines move into gzip
//! archives `history.jsonl.<N>.gz`; see [`rotate`].

mod rotate;
mod suppression;

pub use rotate::{MAX_ARCHIVES, archive_numbers};
pub use suppression::suppression_examples;

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Finding, Usage};

/// Name of the active history file inside the state directory
pub const HISTORY_FILE: &str = "history.jsonl";

/// Default number of records kept in the active file
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// Longest accepted history line in bytes
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Errors specific to the history file format
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history line in {path} exceeds {limit} bytes")]
    LineTooLong { path: PathBuf, limit: usize },
}

/// Why the user dismissed a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalReason {
    FalsePositive,
    AlreadyCorrect,
    WrongSuggestion,
    OutOfScope,
}

impl DismissalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DismissalReason::FalsePositive => "false_positive",
            DismissalReason::AlreadyCorrect => "already_correct",
            DismissalReason::WrongSuggestion => "wrong_suggestion",
            DismissalReason::OutOfScope => "out_of_scope",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "false_positive" | "fp" => Some(DismissalReason::FalsePositive),
            "already_correct" => Some(DismissalReason::AlreadyCorrect),
            "wrong_suggestion" => Some(DismissalReason::WrongSuggestion),
            "out_of_scope" | "oos" => Some(DismissalReason::OutOfScope),
            _ => None,
        }
    }
}

impl std::fmt::Display for DismissalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single dismissed finding with its optional reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dismissal {
    pub finding_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DismissalReason>,
}

/// What the user (or auto-dismissal) did with a review's output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAction {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dismissed_ids: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dismissals: Vec<Dismissal>,

    /// RFC 3339 UTC timestamp set when a session is finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace_findings: bool,
}

/// Settings the review ran with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfigSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strictness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_symbol_max_definitions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_symbol_max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nitpicky: Option<bool>,
}

/// One line of the history file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Commit the recorded review is anchored to
    pub diff_ref: String,

    /// Findings at the time of the record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub review_output: Vec<Finding>,

    #[serde(default)]
    pub user_action: UserAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_config: Option<RunConfigSnapshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Path of the active history file
pub fn history_path(state_dir: &Path) -> PathBuf {
    state_dir.join(HISTORY_FILE)
}

/// Append `record` and rotate when the active file exceeds `max_records`
/// lines (0 disables rotation).
pub fn append(state_dir: &Path, record: &HistoryRecord, max_records: usize) -> Result<()> {
    let path = history_path(state_dir);
    let line = serde_json::to_string(record).context("Failed to serialize history record")?;
    if line.len() > MAX_LINE_BYTES {
        return Err(HistoryError::LineTooLong {
            path,
            limit: MAX_LINE_BYTES,
        }
        .into());
    }

    fs::create_dir_all(state_dir)
        .with_context(|| format!("Failed to create state directory: {}", state_dir.display()))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open history file: {}", path.display()))?;
    file.write_all(format!("{}\n", line).as_bytes())
        .context("Failed to append history record")?;
    file.sync_all().context("Failed to sync history file")?;
    drop(file);

    if max_records > 0 {
        rotate::rotate_if_needed(state_dir, max_records)?;
    }

    Ok(())
}

/// Every retained history line, oldest first: archives in ascending order,
/// then the active file.
pub fn read_lines(state_dir: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for (_, archive) in rotate::list_archives(state_dir)? {
        lines.extend(rotate::read_archive(&archive)?);
    }

    let path = history_path(state_dir);
    match File::open(&path) {
        Ok(file) => lines.extend(read_jsonl_lines(BufReader::new(file), &path)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open history file: {}", path.display()));
        }
    }

    Ok(lines)
}

/// Every retained history record, oldest first.
pub fn read_records(state_dir: &Path) -> Result<Vec<HistoryRecord>> {
    read_lines(state_dir)?
        .iter()
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("Failed to parse history record #{}", i + 1))
        })
        .collect()
}

/// Read non-empty lines, rejecting any longer than [`MAX_LINE_BYTES`].
fn read_jsonl_lines<R: BufRead>(mut reader: R, source: &Path) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .by_ref()
            .take(MAX_LINE_BYTES as u64 + 1)
            .read_until(b'\n', &mut buf)
            .with_context(|| format!("Failed to read {}", source.display()))?;
        if read == 0 {
            break;
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        } else if buf.len() > MAX_LINE_BYTES {
            return Err(HistoryError::LineTooLong {
                path: source.to_path_buf(),
                limit: MAX_LINE_BYTES,
            }
            .into());
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        let line = String::from_utf8_lossy(&buf);
        if !line.trim().is_empty() {
            lines.push(line.into_owned());
        }
    }

    Ok(lines)
}
