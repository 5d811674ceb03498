//! Diff operations for GitManager

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;

use super::GitManager;
use crate::domain::Hunk;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
        .expect("hunk header pattern is valid")
});

impl GitManager {
    /// Hunks of `git diff from to`, limited to `paths` when non-empty.
    pub(super) fn diff_between(&self, from: &str, to: &str, paths: &[String]) -> Result<Vec<Hunk>> {
        let mut args = vec![
            "-c",
            "core.quotePath=false",
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            "-U3",
            from,
            to,
            "--",
        ];
        args.extend(paths.iter().map(String::as_str));

        let output = self.git(&args)?;
        if !output.status.success() {
            bail!(
                "git diff failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let hunks = parse_unified_diff(&String::from_utf8_lossy(&output.stdout));
        tracing::debug!(from, to, hunks = hunks.len(), "Computed diff");
        Ok(hunks)
    }
}

struct OpenHunk {
    hunk: Hunk,
    old_remaining: u32,
    new_remaining: u32,
}

impl OpenHunk {
    fn is_done(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }
}

/// Split unified diff text into hunks.
///
/// Each hunk's content starts with its `@@` header. Deleted files produce
/// hunks with a zero new-file range.
pub fn parse_unified_diff(text: &str) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut old_path: Option<String> = None;
    let mut new_path: Option<String> = None;
    let mut open: Option<OpenHunk> = None;

    for line in text.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);

        if let Some(current) = open.as_mut() {
            if !current.is_done() {
                match bare.as_bytes().first() {
                    Some(b'+') => current.new_remaining = current.new_remaining.saturating_sub(1),
                    Some(b'-') => current.old_remaining = current.old_remaining.saturating_sub(1),
                    Some(b'\\') => {}
                    _ => {
                        current.old_remaining = current.old_remaining.saturating_sub(1);
                        current.new_remaining = current.new_remaining.saturating_sub(1);
                    }
                }
                current.hunk.content.push_str(line);
                continue;
            }
            if bare.starts_with('\\') {
                current.hunk.content.push_str(line);
                continue;
            }
        }

        if bare.starts_with("diff --git ") {
            hunks.extend(open.take().map(|o| o.hunk));
            old_path = None;
            new_path = None;
        } else if let Some(path) = bare.strip_prefix("--- ") {
            old_path = diff_path(path, "a/");
        } else if let Some(path) = bare.strip_prefix("+++ ") {
            new_path = diff_path(path, "b/");
        } else if let Some(caps) = HUNK_HEADER.captures(bare) {
            hunks.extend(open.take().map(|o| o.hunk));

            let number = |i: usize, default: u32| {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(default)
            };
            let old_count = number(2, 1);
            let new_start = number(3, 0);
            let new_count = number(4, 1);

            let Some(file) = new_path.clone().or_else(|| old_path.clone()) else {
                continue;
            };
            open = Some(OpenHunk {
                hunk: Hunk::new(file, new_start, new_count, line),
                old_remaining: old_count,
                new_remaining: new_count,
            });
        }
    }

    hunks.extend(open.map(|o| o.hunk));
    hunks
}

/// Path from a `---`/`+++` line, or None for `/dev/null`.
fn diff_path(raw: &str, prefix: &str) -> Option<String> {
    let raw = raw.trim_end_matches('\t');
    if raw == "/dev/null" {
        return None;
    }
    let unquoted = match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => raw.to_string(),
    };
    Some(
        unquoted
            .strip_prefix(prefix)
            .map(str::to_string)
            .unwrap_or(unquoted),
    )
}
