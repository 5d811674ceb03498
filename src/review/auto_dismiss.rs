use std::collections::{BTreeSet, HashSet};

use crate::domain::{Finding, Hunk};

/// Previous findings that a re-review did not report again.
///
/// A finding qualifies when it is not yet dismissed, its location (range
/// start, else line) falls inside one of the `reviewed` hunks of its file,
/// and its ID is absent from `new_ids`.
pub fn addressed_findings(
    previous: &[Finding],
    dismissed: &BTreeSet<String>,
    reviewed: &[Hunk],
    new_ids: &HashSet<&str>,
) -> Vec<Finding> {
    previous
        .iter()
        .filter(|f| !dismissed.contains(&f.id) && !new_ids.contains(f.id.as_str()))
        .filter(|f| {
            let location = f.location();
            location > 0 && reviewed.iter().any(|h| h.contains_line(&f.file, location))
        })
        .cloned()
        .collect()
}
