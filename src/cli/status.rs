//! Status command implementation

use anyhow::Result;
use std::path::Path;

use super::open_orchestrator;

/// Show the current review session
pub fn status_command(work_dir: &Path, json: bool) -> Result<()> {
    let orchestrator = open_orchestrator(work_dir)?;
    let report = orchestrator.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Session:       {}", report.session_id);
    println!("Baseline:      {}", report.baseline_ref);
    println!("Last reviewed: {}", report.last_reviewed_at);
    println!(
        "Findings:      {} ({} active, {} dismissed)",
        report.findings, report.active, report.dismissed
    );
    if let Some(strictness) = &report.options.strictness {
        println!("Strictness:    {}", strictness);
    }
    if report.options.nitpicky == Some(true) {
        println!("Nitpicky:      yes");
    }
    if let Some(usage) = &report.last_usage {
        println!(
            "Last usage:    {} prompt / {} completion tokens",
            usage.prompt_tokens, usage.completion_tokens
        );
    }
    if let Some(worktree) = &report.worktree {
        println!("Worktree:      {}", worktree.display());
    }

    Ok(())
}
