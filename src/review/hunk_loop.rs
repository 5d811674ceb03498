//! The per-hunk review loop.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::domain::{Finding, Hunk, Usage};
use crate::findings::{
    Strictness, assign_cursor_uris, assign_finding_ids, filter_abstention, filter_banned_phrases,
    filter_by_hunk_lines, parse_findings_with,
};

use super::stream::{self, EventSink, StreamEvent};
use super::{Generation, Orchestrator, PromptContext};

/// Settings fixed for one review pass
pub(super) struct ReviewPass {
    pub dry_run: bool,
    pub strictness: Strictness,
    pub prompt: PromptContext,
}

/// What the loop produced, in hunk order
#[derive(Debug, Default)]
pub(super) struct LoopOutput {
    pub findings: Vec<Finding>,
    /// `(finding id, raw hunk text)` for every kept finding
    pub contexts: Vec<(String, String)>,
    pub usage: Usage,
}

impl Orchestrator {
    pub(super) async fn review_hunks(
        &self,
        hunks: &[Hunk],
        pass: &ReviewPass,
        sink: &mut Option<&mut EventSink<'_>>,
    ) -> Result<LoopOutput> {
        let reviewer = if pass.dry_run {
            None
        } else {
            Some(self.reviewer()?)
        };

        let mut output = LoopOutput::default();
        for (index, hunk) in hunks.iter().enumerate() {
            let label = format!("{}:{}-{}", hunk.file, hunk.new_start, hunk.new_end);
            tracing::debug!(hunk = %label, "Reviewing hunk {}/{}", index + 1, hunks.len());
            stream::emit(
                sink,
                StreamEvent::Progress {
                    msg: format!("Reviewing {} ({}/{})", label, index + 1, hunks.len()),
                },
            );

            let generation = match reviewer {
                None => canned_generation(hunk),
                Some(reviewer) => {
                    let prompt = self.prompt_builder.build(hunk, &pass.prompt);
                    reviewer
                        .generate(&prompt)
                        .await
                        .with_context(|| format!("Review of {} failed", label))?
                }
            };

            let findings = self.filter_hunk_findings(hunk, &generation.text, &pass.strictness)?;
            for finding in &findings {
                output.contexts.push((finding.id.clone(), hunk.content.clone()));
                stream::emit(sink, StreamEvent::Finding { data: finding });
            }
            output.findings.extend(findings);
            output.usage += generation.usage;
        }

        tracing::info!(
            hunks = hunks.len(),
            findings = output.findings.len(),
            "Reviewed hunks"
        );
        Ok(output)
    }

    /// Parse, identify, filter and link the findings in one response.
    fn filter_hunk_findings(
        &self,
        hunk: &Hunk,
        text: &str,
        strictness: &Strictness,
    ) -> Result<Vec<Finding>> {
        let parsed = parse_findings_with(text, |index, reason| {
            tracing::debug!(file = %hunk.file, index, "Dropped invalid finding: {}", reason);
        })
        .with_context(|| format!("Could not read review of {}", hunk.file))?;

        let identified = assign_finding_ids(parsed, &hunk.file);
        let mut kept = filter_abstention(&identified, strictness.min_keep, strictness.min_maint);
        if strictness.apply_kill_list {
            kept = filter_banned_phrases(&kept);
        }
        let kept = filter_by_hunk_lines(&kept, &hunk.file, hunk.new_start, hunk.new_end);
        Ok(assign_cursor_uris(&kept, self.vcs.repo_root()))
    }
}

/// Stand-in response used by dry runs: one finding at the hunk's first line
/// whose message carries a digest of the hunk text.
pub(super) fn canned_generation(hunk: &Hunk) -> Generation {
    let digest = format!("{:x}", Sha256::digest(hunk.content.as_bytes()));
    let message = format!(
        "Dry-run finding for {}:{}-{} ({})",
        hunk.file,
        hunk.new_start,
        hunk.new_end,
        &digest[..8]
    );
    let text = serde_json::json!([{
        "file": hunk.file,
        "line": hunk.new_start,
        "severity": "info",
        "category": "correctness",
        "confidence": 1.0,
        "message": message,
    }])
    .to_string();

    Generation {
        text,
        usage: Usage::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::parse_findings;

    #[test]
    fn canned_output_parses_and_tracks_content() {
        let a = Hunk::new("a.rs", 4, 2, "@@ -4 +4,2 @@\n+x\n+y\n");
        let b = Hunk::new("a.rs", 4, 2, "@@ -4 +4,2 @@\n+x\n+z\n");

        let parsed = parse_findings(&canned_generation(&a).text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].line, 4);
        assert!(parsed[0].message.starts_with("Dry-run finding for a.rs:4-5"));

        let ids_a = assign_finding_ids(parsed, "a.rs");
        let ids_b = assign_finding_ids(parse_findings(&canned_generation(&b).text).unwrap(), "a.rs");
        assert_ne!(ids_a[0].id, ids_b[0].id);
    }
}
