//! dismiss and list commands

use anyhow::{Result, bail};
use std::path::Path;

use stet::history::DismissalReason;

use super::{format_finding, open_orchestrator};

pub fn dismiss_command(work_dir: &Path, id: &str, reason: Option<&str>) -> Result<()> {
    let reason = match reason {
        Some(raw) => match DismissalReason::from_str(raw) {
            Some(reason) => Some(reason),
            None => bail!(
                "Unknown dismissal reason: {} (expected false_positive, already_correct, wrong_suggestion or out_of_scope)",
                raw
            ),
        },
        None => None,
    };

    let orchestrator = open_orchestrator(work_dir)?;
    let outcome = orchestrator.dismiss(id, reason)?;
    if outcome.already_dismissed {
        println!("Finding {} was already dismissed", outcome.id);
    } else {
        println!("Dismissed {}", outcome.id);
    }
    Ok(())
}

pub fn list_command(work_dir: &Path, json: bool) -> Result<()> {
    let orchestrator = open_orchestrator(work_dir)?;
    let findings = orchestrator.active_findings()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&findings)?);
        return Ok(());
    }

    if findings.is_empty() {
        println!("No active findings.");
        return Ok(());
    }

    println!("Findings ({}):\n", findings.len());
    for finding in &findings {
        println!("  {}", format_finding(finding));
    }
    Ok(())
}
