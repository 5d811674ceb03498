use std::collections::BTreeSet;

use crate::error::{MIN_FINDING_ID_PREFIX, StetError};

/// Resolve a user-supplied ID prefix to the one full ID it identifies.
///
/// Matching is case-insensitive and needs at least
/// [`MIN_FINDING_ID_PREFIX`] characters.
pub fn resolve_finding_id<'a, I>(ids: I, prefix: &str) -> Result<String, StetError>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.trim();
    if prefix.chars().count() < MIN_FINDING_ID_PREFIX {
        return Err(StetError::FindingIdTooShort);
    }
    let needle = prefix.to_lowercase();

    let matches: BTreeSet<&str> = ids
        .into_iter()
        .filter(|id| !id.is_empty() && id.to_lowercase().starts_with(&needle))
        .collect();

    let mut iter = matches.into_iter();
    match (iter.next(), iter.next()) {
        (Some(id), None) => Ok(id.to_string()),
        (None, _) => Err(StetError::FindingIdNotFound(prefix.to_string())),
        (Some(_), Some(_)) => Err(StetError::FindingIdAmbiguous(prefix.to_string())),
    }
}
