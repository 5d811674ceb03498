//! Post-filters applied to reviewer findings.
//!
//! Every filter takes a slice and returns a new list, keeping the relative
//! order of the findings it keeps. The orchestrator runs them in the order
//! abstention, kill list (when enabled), evidence.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Category, Finding};
use crate::error::StetError;

/// Phrases that mark low-value, generic review comments.
const BANNED_PHRASES: &[&str] = &[
    "consider adding comments",
    "consider adding a comment",
    "consider adding more comments",
    "consider adding documentation",
    "ensure that",
    "it might be beneficial",
    "it would be beneficial",
    "you might want to",
    "it is recommended to",
];

static BANNED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = BANNED_PHRASES.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!("(?i){}", alternatives.join("|")))
        .expect("banned phrases are escaped literals")
});

/// Post-filter thresholds derived from a strictness preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strictness {
    /// Findings below this confidence are dropped
    pub min_keep: f64,
    /// Maintainability findings below this confidence are dropped
    pub min_maint: f64,
    /// Whether the banned-phrase list is applied
    pub apply_kill_list: bool,
}

impl Default for Strictness {
    fn default() -> Self {
        Self {
            min_keep: 0.8,
            min_maint: 0.9,
            apply_kill_list: true,
        }
    }
}

impl Strictness {
    /// Resolve a preset name such as `strict`, `Default` or `lenient+`.
    ///
    /// An empty name means `default`. A trailing `+` keeps the thresholds but
    /// turns the kill list off.
    pub fn resolve(preset: &str) -> Result<Self, StetError> {
        let trimmed = preset.trim().to_lowercase();
        let (name, plus) = match trimmed.strip_suffix('+') {
            Some(name) => (name, true),
            None => (trimmed.as_str(), false),
        };

        let (min_keep, min_maint) = match name {
            "strict" => (0.6, 0.7),
            "" | "default" => (0.8, 0.9),
            "lenient" => (0.9, 0.95),
            _ => return Err(StetError::InvalidStrictness(preset.to_string())),
        };

        Ok(Self {
            min_keep,
            min_maint,
            apply_kill_list: !plus,
        })
    }

    /// Nitpicky mode always disables the kill list.
    pub fn with_nitpicky(mut self, nitpicky: bool) -> Self {
        if nitpicky {
            self.apply_kill_list = false;
        }
        self
    }
}

/// Drop findings the model is not confident enough about.
pub fn filter_abstention(findings: &[Finding], min_keep: f64, min_maint: f64) -> Vec<Finding> {
    findings
        .iter()
        .filter(|f| {
            if f.confidence < min_keep {
                return false;
            }
            !(f.category == Category::Maintainability && f.confidence < min_maint)
        })
        .cloned()
        .collect()
}

/// Whether a message contains one of the banned phrases
pub fn is_banned_message(message: &str) -> bool {
    BANNED_PATTERN.is_match(message)
}

/// Drop findings whose message matches the banned-phrase list, regardless of confidence.
pub fn filter_banned_phrases(findings: &[Finding]) -> Vec<Finding> {
    findings
        .iter()
        .filter(|f| !is_banned_message(&f.message))
        .cloned()
        .collect()
}

/// Drop findings that claim a location in `file` outside `[hunk_start, hunk_end]`.
///
/// Findings on other files and file-level findings are kept. When the hunk
/// range itself is invalid nothing is filtered.
pub fn filter_by_hunk_lines(
    findings: &[Finding],
    file: &str,
    hunk_start: u32,
    hunk_end: u32,
) -> Vec<Finding> {
    if hunk_start < 1 || hunk_end < hunk_start {
        return findings.to_vec();
    }

    findings
        .iter()
        .filter(|f| {
            if f.file != file || f.is_file_level() {
                return true;
            }
            match f.range {
                Some(range) => range.is_valid() && range.overlaps(hunk_start, hunk_end),
                None => (hunk_start..=hunk_end).contains(&f.line),
            }
        })
        .cloned()
        .collect()
}
