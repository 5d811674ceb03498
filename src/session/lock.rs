use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::error::StetError;

/// Zero-byte marker file whose exclusive lock guards the state directory
pub const LOCK_FILE: &str = "lock";

/// Exclusive, non-blocking advisory lock on a state directory.
///
/// The lock is released when the guard is dropped; [`SessionLock::release`]
/// does the same but reports unlock failures.
#[derive(Debug)]
pub struct SessionLock {
    file: Option<File>,
    path: PathBuf,
}

impl SessionLock {
    /// Take the lock, failing with [`StetError::Locked`] if another holder has it.
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;

        let path = state_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Acquired session lock");
                Ok(Self {
                    file: Some(file),
                    path,
                })
            }
            Err(e) if is_contended(&e) => Err(StetError::Locked.into()),
            Err(e) => Err(e).with_context(|| format!("Failed to lock {}", path.display())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file)
                .with_context(|| format!("Failed to unlock {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
