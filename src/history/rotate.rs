//! Moving old history lines into gzip archives.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::{HISTORY_FILE, history_path, read_jsonl_lines};

/// Archives kept next to the active file; older ones are deleted
pub const MAX_ARCHIVES: usize = 5;

fn archive_path(state_dir: &Path, number: u32) -> PathBuf {
    state_dir.join(format!("{}.{}.gz", HISTORY_FILE, number))
}

fn archive_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(HISTORY_FILE)?
        .strip_prefix('.')?
        .strip_suffix(".gz")?
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
}

/// Existing archives sorted by number, oldest first.
pub(super) fn list_archives(state_dir: &Path) -> Result<Vec<(u32, PathBuf)>> {
    let entries = match fs::read_dir(state_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to list state directory: {}", state_dir.display()));
        }
    };

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read state directory entry")?;
        if let Some(number) = entry.file_name().to_str().and_then(archive_number) {
            archives.push((number, entry.path()));
        }
    }
    archives.sort_by_key(|(number, _)| *number);
    Ok(archives)
}

/// Numbers of the archives currently on disk, ascending.
pub fn archive_numbers(state_dir: &Path) -> Result<Vec<u32>> {
    Ok(list_archives(state_dir)?.into_iter().map(|(n, _)| n).collect())
}

pub(super) fn read_archive(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open history archive: {}", path.display()))?;
    read_jsonl_lines(BufReader::new(GzDecoder::new(file)), path)
}

/// Keep the newest `max_records` lines in the active file, archiving the rest.
pub(super) fn rotate_if_needed(state_dir: &Path, max_records: usize) -> Result<()> {
    let path = history_path(state_dir);
    let file = File::open(&path)
        .with_context(|| format!("Failed to open history file: {}", path.display()))?;
    let lines = read_jsonl_lines(BufReader::new(file), &path)?;
    if lines.len() <= max_records {
        return Ok(());
    }

    let (dropped, kept) = lines.split_at(lines.len() - max_records);

    // Numbering continues past the newest archive so pruned gaps never
    // reorder what is read back.
    let next = list_archives(state_dir)?
        .last()
        .map(|(n, _)| n + 1)
        .unwrap_or(1);
    let archive = archive_path(state_dir, next);
    write_archive(&archive, dropped)?;
    rewrite_active(&path, kept)?;
    prune_archives(state_dir)?;

    tracing::debug!(
        archived = dropped.len(),
        kept = kept.len(),
        archive = %archive.display(),
        "Rotated review history"
    );
    Ok(())
}

fn write_archive(path: &Path, lines: &[String]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create history archive: {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    for line in lines {
        encoder.write_all(line.as_bytes())?;
        encoder.write_all(b"\n")?;
    }
    let writer = encoder.finish().context("Failed to finish history archive")?;
    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush history archive")?;
    file.sync_all().context("Failed to sync history archive")?;
    Ok(())
}

fn rewrite_active(path: &Path, lines: &[String]) -> Result<()> {
    let temp_path = path.with_extension("jsonl.tmp");
    {
        let mut temp = File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
        let mut body = String::new();
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        temp.write_all(body.as_bytes())?;
        temp.sync_all()?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("Failed to replace history file: {}", path.display()));
    }
    Ok(())
}

fn prune_archives(state_dir: &Path) -> Result<()> {
    let archives = list_archives(state_dir)?;
    if archives.len() <= MAX_ARCHIVES {
        return Ok(());
    }
    for (_, path) in &archives[..archives.len() - MAX_ARCHIVES] {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove history archive: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{HistoryRecord, append, read_records};
    use super::*;
    use tempfile::TempDir;

    fn record(diff_ref: &str) -> HistoryRecord {
        HistoryRecord {
            diff_ref: diff_ref.to_string(),
            ..Default::default()
        }
    }

    fn refs(state_dir: &Path) -> Vec<String> {
        read_records(state_dir)
            .unwrap()
            .into_iter()
            .map(|r| r.diff_ref)
            .collect()
    }

    #[test]
    fn overflow_moves_oldest_lines_to_first_archive() {
        let temp = TempDir::new().unwrap();
        for r in ["a", "b", "c"] {
            append(temp.path(), &record(r), 2).unwrap();
        }

        assert_eq!(archive_numbers(temp.path()).unwrap(), vec![1]);
        let archived = read_archive(&archive_path(temp.path(), 1)).unwrap();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].contains("\"a\""));

        let active = fs::read_to_string(history_path(temp.path())).unwrap();
        assert_eq!(active.lines().count(), 2);
        assert_eq!(refs(temp.path()), vec!["a", "b", "c"]);
    }

    #[test]
    fn archive_count_is_bounded_and_order_preserved() {
        let temp = TempDir::new().unwrap();
        let all: Vec<String> = (0..20).map(|i| format!("r{:02}", i)).collect();
        for r in &all {
            append(temp.path(), &record(r), 3).unwrap();
        }

        let numbers = archive_numbers(temp.path()).unwrap();
        assert_eq!(numbers.len(), MAX_ARCHIVES);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));

        let active = fs::read_to_string(history_path(temp.path())).unwrap();
        assert_eq!(active.lines().count(), 3);

        // Five single-line archives plus three active lines survive.
        assert_eq!(refs(temp.path()), all[12..].to_vec());
    }

    #[test]
    fn zero_max_records_disables_rotation() {
        let temp = TempDir::new().unwrap();
        for i in 0..10 {
            append(temp.path(), &record(&i.to_string()), 0).unwrap();
        }
        assert!(archive_numbers(temp.path()).unwrap().is_empty());
        assert_eq!(refs(temp.path()).len(), 10);
    }

    #[test]
    fn archive_names_are_parsed_strictly() {
        assert_eq!(archive_number("history.jsonl.3.gz"), Some(3));
        assert_eq!(archive_number("history.jsonl.0.gz"), None);
        assert_eq!(archive_number("history.jsonl.gz"), None);
        assert_eq!(archive_number("history.jsonl.x.gz"), None);
        assert_eq!(archive_number("history.jsonl"), None);
    }
}
