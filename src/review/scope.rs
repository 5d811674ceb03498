//! Splitting the baseline→HEAD diff into hunks to review and hunks already
//! reviewed.

use anyhow::{Context, Result};

use crate::domain::{Finding, Hunk};
use crate::git::Vcs;

/// Hunks still to review and hunks approved by an earlier pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub to_review: Vec<Hunk>,
    pub approved: Vec<Hunk>,
}

/// Partition the review scope.
///
/// With an empty `last_reviewed_at` everything in `baseline → head` is to
/// review. Otherwise only `last_reviewed_at → head` is, and
/// `baseline → last_reviewed_at` counts as approved.
pub fn partition(
    vcs: &dyn Vcs,
    baseline: &str,
    head: &str,
    last_reviewed_at: &str,
    paths: &[String],
) -> Result<Partition> {
    if last_reviewed_at.is_empty() {
        let to_review = vcs
            .diff_hunks(baseline, head, paths)
            .context("Failed to diff baseline against HEAD")?;
        return Ok(Partition {
            to_review,
            approved: Vec::new(),
        });
    }

    let to_review = vcs
        .diff_hunks(last_reviewed_at, head, paths)
        .context("Failed to diff last reviewed commit against HEAD")?;
    let approved = vcs
        .diff_hunks(baseline, last_reviewed_at, paths)
        .context("Failed to diff baseline against last reviewed commit")?;
    Ok(Partition {
        to_review,
        approved,
    })
}

/// Remove hunks overlapping the location of any dismissed finding.
///
/// Returns the remaining hunks and how many were skipped. Findings without
/// a line span do not exclude anything.
pub fn skip_dismissed<'a>(
    hunks: Vec<Hunk>,
    dismissed: impl IntoIterator<Item = &'a Finding>,
) -> (Vec<Hunk>, usize) {
    let rects: Vec<(&str, u32, u32)> = dismissed
        .into_iter()
        .filter_map(|f| f.span().map(|(start, end)| (f.file.as_str(), start, end)))
        .collect();
    if rects.is_empty() {
        return (hunks, 0);
    }

    let before = hunks.len();
    let kept: Vec<Hunk> = hunks
        .into_iter()
        .filter(|h| !rects.iter().any(|(file, start, end)| h.overlaps(file, *start, *end)))
        .collect();
    let skipped = before - kept.len();
    (kept, skipped)
}
