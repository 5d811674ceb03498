//! Review notes stored with `git notes`

use anyhow::{Context, Result, anyhow, bail};
use std::io::Write;
use std::process::{Command, Stdio};

use super::GitManager;

/// Notes namespace holding one review summary per commit
pub const NOTES_REF: &str = "refs/notes/stet";

impl GitManager {
    pub(super) fn write_note(&self, commit: &str, body: &str) -> Result<()> {
        let mut child = Command::new("git")
            .args(["notes", "--ref", NOTES_REF, "add", "-f", "-F", "-", commit])
            .current_dir(self.root())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to run git notes")?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("git notes stdin unavailable"))?;
            stdin
                .write_all(body.as_bytes())
                .context("Failed to write note body")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for git notes")?;
        if !output.status.success() {
            bail!(
                "Failed to write review note: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        tracing::debug!(commit, notes_ref = NOTES_REF, "Wrote review note");
        Ok(())
    }

    /// The review note on `commit`, if any
    pub fn read_note(&self, commit: &str) -> Result<Option<String>> {
        let output = self.git(&["notes", "--ref", NOTES_REF, "show", commit])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }
}
