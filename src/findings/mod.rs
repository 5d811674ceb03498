//! Processing of reviewer output: parsing, post-filters, deep links and
//! ID lookup.

mod cursor;
mod filter;
mod parse;
mod resolve;

pub use cursor::assign_cursor_uris;
pub use filter::{
    Strictness, filter_abstention, filter_banned_phrases, filter_by_hunk_lines, is_banned_message,
};
pub use parse::{ParseError, ResponseShape, assign_finding_ids, parse_findings, parse_findings_with};
pub use resolve::resolve_finding_id;
