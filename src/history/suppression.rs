//! Short "do not report" examples mined from past dismissals.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::domain::Finding;

use super::read_records;

/// Up to `max_examples` example strings from findings the user dismissed
/// within the last `max_records` records, newest last.
///
/// Never fails: unreadable history just yields no examples.
pub fn suppression_examples(state_dir: &Path, max_records: usize, max_examples: usize) -> Vec<String> {
    if max_records == 0 || max_examples == 0 {
        return Vec::new();
    }

    let records = match read_records(state_dir) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!("Skipping suppression examples, history unreadable: {:#}", e);
            return Vec::new();
        }
    };

    let start = records.len().saturating_sub(max_records);
    let mut examples = Vec::new();
    for record in &records[start..] {
        if record.review_output.is_empty() || record.user_action.dismissals.is_empty() {
            continue;
        }
        let by_id: HashMap<&str, &Finding> = record
            .review_output
            .iter()
            .map(|f| (f.id.as_str(), f))
            .collect();

        for dismissal in &record.user_action.dismissals {
            if let Some(finding) = by_id.get(dismissal.finding_id.as_str()) {
                let example = format_example(finding);
                if !example.is_empty() {
                    examples.push(example);
                }
            }
        }
    }

    // Keep the newest copy of each duplicate.
    let mut seen = HashSet::new();
    let mut newest_first: Vec<String> = examples
        .into_iter()
        .rev()
        .filter(|e| seen.insert(e.clone()))
        .take(max_examples)
        .collect();
    newest_first.reverse();
    newest_first
}

fn format_example(finding: &Finding) -> String {
    let message = normalize_whitespace(&finding.message);
    if message.is_empty() {
        return String::new();
    }
    let file = finding.file.trim();
    if file.is_empty() {
        message
    } else if finding.line == 0 {
        format!("{}: {}", file, message)
    } else {
        format!("{}:{}: {}", file, finding.line, message)
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{
        DEFAULT_MAX_RECORDS, Dismissal, DismissalReason, HistoryRecord, UserAction, append,
        history_path,
    };
    use tempfile::TempDir;

    fn finding(id: &str, file: &str, line: u32, message: &str) -> Finding {
        Finding {
            id: id.to_string(),
            file: file.to_string(),
            line,
            confidence: 1.0,
            message: message.to_string(),
            ..Default::default()
        }
    }

    fn dismissed(findings: Vec<Finding>, ids: &[&str]) -> HistoryRecord {
        HistoryRecord {
            diff_ref: "base".to_string(),
            review_output: findings,
            user_action: UserAction {
                dismissed_ids: ids.iter().map(|s| s.to_string()).collect(),
                dismissals: ids
                    .iter()
                    .map(|id| Dismissal {
                        finding_id: id.to_string(),
                        reason: Some(DismissalReason::FalsePositive),
                    })
                    .collect(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_dismissals_collapse_to_one_example() {
        let temp = TempDir::new().unwrap();
        let f = finding("id1", "a.go", 10, "Use   of   foo");
        append(temp.path(), &dismissed(vec![f.clone()], &["id1"]), DEFAULT_MAX_RECORDS).unwrap();
        append(temp.path(), &dismissed(vec![f], &["id1"]), DEFAULT_MAX_RECORDS).unwrap();

        assert_eq!(
            suppression_examples(temp.path(), 100, 10),
            vec!["a.go:10: Use of foo".to_string()]
        );
    }

    #[test]
    fn formats_file_level_and_bare_findings() {
        let temp = TempDir::new().unwrap();
        let record = dismissed(
            vec![
                finding("x", "b.rs", 0, "whole file"),
                finding("y", "", 4, "no\nfile"),
                finding("z", "c.rs", 2, "not dismissed"),
            ],
            &["x", "y", "missing"],
        );
        append(temp.path(), &record, DEFAULT_MAX_RECORDS).unwrap();

        assert_eq!(
            suppression_examples(temp.path(), 10, 10),
            vec!["b.rs: whole file".to_string(), "no file".to_string()]
        );
    }

    #[test]
    fn keeps_only_the_newest_examples() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            let id = format!("id{}", i);
            let record = dismissed(vec![finding(&id, "a.rs", i + 1, "msg")], &[id.as_str()]);
            append(temp.path(), &record, DEFAULT_MAX_RECORDS).unwrap();
        }

        assert_eq!(
            suppression_examples(temp.path(), 100, 2),
            vec!["a.rs:4: msg".to_string(), "a.rs:5: msg".to_string()]
        );
        assert_eq!(suppression_examples(temp.path(), 1, 10), vec!["a.rs:5: msg".to_string()]);
    }

    #[test]
    fn unreadable_history_yields_nothing() {
        let temp = TempDir::new().unwrap();
        std::fs::write(history_path(temp.path()), "{not json\n").unwrap();
        assert!(suppression_examples(temp.path(), 10, 10).is_empty());

        let empty = TempDir::new().unwrap();
        assert!(suppression_examples(empty.path(), 10, 10).is_empty());
    }
}
