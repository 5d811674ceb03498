//! Core domain types for stet

mod finding;
mod hunk;
mod usage;

pub use finding::{
    Category, DISPLAY_ID_LEN, Finding, FindingError, LineRange, RawFinding, RawRange, Severity,
    display_id, stable_id,
};
pub use hunk::{Hunk, HunkStats};
pub use usage::Usage;
