//! start, run, rerun and finish commands

use anyhow::Result;
use std::path::Path;

use stet::review::{EventSink, RunRequest, StartRequest};
use stet::session::RunOptions;

use super::{open_orchestrator, print_findings};

/// Arguments of `stet start`
pub struct StartArgs {
    pub reference: String,
    pub dry_run: bool,
    pub allow_dirty: bool,
    pub strictness: Option<String>,
    pub nitpicky: bool,
    pub stream: bool,
    pub paths: Vec<String>,
}

pub async fn start_command(work_dir: &Path, args: StartArgs) -> Result<()> {
    let orchestrator = open_orchestrator(work_dir)?;
    let request = StartRequest {
        reference: args.reference,
        dry_run: args.dry_run,
        allow_dirty: args.allow_dirty,
        paths: args.paths,
        options: RunOptions {
            strictness: args.strictness,
            nitpicky: args.nitpicky.then_some(true),
            ..Default::default()
        },
    };

    if args.stream {
        let mut stdout = std::io::stdout();
        let mut sink = EventSink::new(&mut stdout);
        orchestrator.start(&request, Some(&mut sink)).await?;
        return Ok(());
    }

    let outcome = orchestrator.start(&request, None).await?;
    println!(
        "Started session {} at {}",
        outcome.session_id,
        short_sha(&outcome.baseline)
    );
    if let Some(worktree) = &outcome.worktree {
        println!("Baseline worktree: {}", worktree.display());
    }
    println!(
        "Reviewed {} hunks, {} findings",
        outcome.hunks_reviewed,
        outcome.findings.len()
    );
    print_findings(&outcome.findings);
    Ok(())
}

pub async fn run_command(
    work_dir: &Path,
    dry_run: bool,
    force: bool,
    replace: bool,
    stream: bool,
) -> Result<()> {
    let orchestrator = open_orchestrator(work_dir)?;
    let request = RunRequest {
        dry_run,
        force_full_review: force,
        replace_findings: replace,
        ..Default::default()
    };

    if stream {
        let mut stdout = std::io::stdout();
        let mut sink = EventSink::new(&mut stdout);
        orchestrator.run(&request, Some(&mut sink)).await?;
        return Ok(());
    }

    let outcome = orchestrator.run(&request, None).await?;
    if outcome.hunks_reviewed == 0 {
        println!("Nothing new to review at {}", short_sha(&outcome.head));
        return Ok(());
    }

    println!(
        "Reviewed {} hunks ({} skipped), {} new findings",
        outcome.hunks_reviewed,
        outcome.hunks_skipped,
        outcome.new_findings.len()
    );
    print_findings(&outcome.new_findings);
    if !outcome.auto_dismissed.is_empty() {
        println!("Auto-dismissed {} addressed findings", outcome.auto_dismissed.len());
    }
    Ok(())
}

pub async fn finish_command(work_dir: &Path) -> Result<()> {
    let orchestrator = open_orchestrator(work_dir)?;
    let outcome = orchestrator.finish().await?;
    let note = outcome.note;

    println!(
        "Finished session {} ({}..{})",
        note.session_id,
        short_sha(&note.baseline_sha),
        short_sha(&note.head_sha)
    );
    println!(
        "  {} findings, {} dismissed, {} hunks, +{} -{} lines",
        note.findings_count,
        note.dismissals_count,
        note.hunks_reviewed,
        note.lines_added,
        note.lines_removed
    );
    Ok(())
}

fn short_sha(sha: &str) -> &str {
    sha.get(..12).unwrap_or(sha)
}
