//! CLI command implementations

pub mod findings;
pub mod review;
pub mod status;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use stet::Finding;
use stet::config::Config;
use stet::git::{GitManager, find_git_root};
use stet::ollama::{GenerateOptions, OllamaClient};
use stet::review::{Orchestrator, ReviewSettings};

/// Build an orchestrator for the repository containing `work_dir`.
pub fn open_orchestrator(work_dir: &Path) -> Result<Orchestrator> {
    let root = find_git_root(work_dir)
        .with_context(|| format!("Not inside a git repository: {}", work_dir.display()))?;
    let config = Config::load(&root)?;
    let state_dir = config.state_dir(&root);

    let git = GitManager::new(&root)?.with_state_dir(&state_dir);
    let client = OllamaClient::new(
        &config.ollama_base_url,
        &config.model,
        Duration::from_secs(config.timeout_secs),
    )
    .with_options(GenerateOptions {
        num_ctx: config.context_limit,
        temperature: config.temperature,
    });

    tracing::debug!(
        root = %root.display(),
        state_dir = %state_dir.display(),
        model = %config.model,
        "Opened repository"
    );

    Ok(Orchestrator::new(Arc::new(git), state_dir)
        .with_reviewer(Arc::new(client))
        .with_settings(ReviewSettings::from(&config)))
}

/// One-line rendering of a finding plus its suggestion, if any
pub fn format_finding(finding: &Finding) -> String {
    let location = match finding.range {
        Some(range) if range.start != range.end => {
            format!("{}:{}-{}", finding.file, range.start, range.end)
        }
        _ if finding.location() > 0 => format!("{}:{}", finding.file, finding.location()),
        _ => finding.file.clone(),
    };

    let mut line = format!(
        "{} [{}/{}] {} {}",
        finding.display_id(),
        finding.severity,
        finding.category,
        location,
        finding.message
    );
    if let Some(suggestion) = &finding.suggestion {
        line.push_str(&format!("\n    Suggestion: {}", suggestion));
    }
    line
}

fn print_findings(findings: &[Finding]) {
    for finding in findings {
        println!("  {}", format_finding(finding));
    }
}
