use serde::{Deserialize, Serialize};

/// A contiguous change block of a diff, located by its new-file line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Repository-relative path in the new tree
    pub file: String,
    /// First line of the hunk in the new file (1-based; 0 for deleted files)
    pub new_start: u32,
    /// Last line of the hunk in the new file, inclusive
    pub new_end: u32,
    /// Raw hunk text including the `@@` header
    pub content: String,
}

/// Size counters for one or more hunks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkStats {
    pub hunks: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub chars_added: usize,
    pub chars_deleted: usize,
    pub chars_reviewed: usize,
}

impl std::ops::AddAssign for HunkStats {
    fn add_assign(&mut self, other: Self) {
        self.hunks += other.hunks;
        self.lines_added += other.lines_added;
        self.lines_removed += other.lines_removed;
        self.chars_added += other.chars_added;
        self.chars_deleted += other.chars_deleted;
        self.chars_reviewed += other.chars_reviewed;
    }
}

impl Hunk {
    /// Build a hunk from its `+start,count` header values.
    pub fn new(
        file: impl Into<String>,
        new_start: u32,
        new_count: u32,
        content: impl Into<String>,
    ) -> Self {
        let new_end = new_start.saturating_add(new_count.saturating_sub(1));
        Self {
            file: file.into(),
            new_start,
            new_end,
            content: content.into(),
        }
    }

    pub fn has_valid_range(&self) -> bool {
        self.new_start >= 1 && self.new_end >= self.new_start
    }

    /// Whether `[start, end]` in `file` intersects this hunk's new-file range
    pub fn overlaps(&self, file: &str, start: u32, end: u32) -> bool {
        self.file == file && start <= self.new_end && end >= self.new_start
    }

    pub fn contains_line(&self, file: &str, line: u32) -> bool {
        self.overlaps(file, line, line)
    }

    pub fn stats(&self) -> HunkStats {
        let mut stats = HunkStats {
            hunks: 1,
            chars_reviewed: self.content.len(),
            ..Default::default()
        };

        for line in self.content.lines() {
            if line.starts_with("@@") {
                continue;
            }
            if let Some(added) = line.strip_prefix('+') {
                stats.lines_added += 1;
                stats.chars_added += added.len();
            } else if let Some(removed) = line.strip_prefix('-') {
                stats.lines_removed += 1;
                stats.chars_deleted += removed.len();
            }
        }

        stats
    }
}
