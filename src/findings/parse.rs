//! Decoding reviewer responses into findings.
//!
//! Three response shapes are accepted, tried in order:
//! 1. a JSON array of finding objects,
//! 2. an object with a `findings` array,
//! 3. a single finding object.
//!
//! Items of the first two shapes are normalized and invalid ones are dropped.
//! A single object is taken as-is and must validate. An empty object `{}`
//! counts as no findings.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Finding, FindingError, RawFinding};

/// Why a response could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("reviewer returned an empty response")]
    Empty,

    #[error("response is not a list of findings")]
    Json(#[source] serde_json::Error),

    #[error("response finding is invalid")]
    InvalidFinding(#[from] FindingError),
}

/// A decoded response, before findings are normalized
#[derive(Debug)]
pub enum ResponseShape {
    Array(Vec<Value>),
    Wrapped(Vec<Value>),
    Single(RawFinding),
}

#[derive(Deserialize)]
struct WrappedFindings {
    findings: Vec<Value>,
}

impl ResponseShape {
    /// Decode `text`, reporting the array attempt's error when no shape fits.
    pub fn decode(text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }

        let array_err = match serde_json::from_str::<Vec<Value>>(text) {
            Ok(items) => return Ok(Self::Array(items)),
            Err(e) => e,
        };
        if let Ok(wrapped) = serde_json::from_str::<WrappedFindings>(text) {
            return Ok(Self::Wrapped(wrapped.findings));
        }
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text)
            && map.is_empty()
        {
            return Ok(Self::Wrapped(Vec::new()));
        }
        if let Ok(raw) = serde_json::from_str::<RawFinding>(text) {
            return Ok(Self::Single(raw));
        }

        Err(ParseError::Json(array_err))
    }
}

/// Parse a reviewer response, silently dropping invalid list items.
pub fn parse_findings(text: &str) -> Result<Vec<Finding>, ParseError> {
    parse_findings_with(text, |_, _| {})
}

/// Parse a reviewer response; `on_drop` receives the index and reason of
/// every list item that was discarded.
pub fn parse_findings_with<F>(text: &str, mut on_drop: F) -> Result<Vec<Finding>, ParseError>
where
    F: FnMut(usize, &FindingError),
{
    match ResponseShape::decode(text)? {
        ResponseShape::Array(items) | ResponseShape::Wrapped(items) => {
            Ok(normalize_items(items, &mut on_drop))
        }
        ResponseShape::Single(raw) => Ok(vec![raw.into_strict()?]),
    }
}

fn normalize_items<F>(items: Vec<Value>, on_drop: &mut F) -> Vec<Finding>
where
    F: FnMut(usize, &FindingError),
{
    let mut findings = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let decoded = if item.is_object() {
            serde_json::from_value::<RawFinding>(item)
                .map_err(|_| FindingError::Malformed)
                .and_then(RawFinding::normalize)
        } else {
            Err(FindingError::Malformed)
        };

        match decoded {
            Ok(finding) => findings.push(finding),
            Err(reason) => on_drop(index, &reason),
        }
    }
    findings
}

/// Fill in `file` from the hunk where the model left it out and give every
/// finding its stable ID.
pub fn assign_finding_ids(findings: Vec<Finding>, hunk_file: &str) -> Vec<Finding> {
    findings
        .into_iter()
        .map(|mut f| {
            if f.file.is_empty() {
                f.file = hunk_file.to_string();
            }
            f.id = f.stable_id();
            f
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Category, Severity};

    #[test]
    fn parses_array_and_drops_invalid_items() {
        let text = r#"
            [
              {"file":"a.rs","line":3,"severity":"error","category":"bug","confidence":0.9,"message":"boom"},
              {"file":"a.rs","line":4,"severity":"loud","category":"???","message":"coerced"},
              {"file":"a.rs","line":5,"severity":"info","category":"bug","message":""},
              null,
              7
            ]
        "#;
        let mut dropped = Vec::new();
        let findings = parse_findings_with(text, |i, e| dropped.push((i, e.clone()))).unwrap();

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[1].severity, Severity::Warning);
        assert_eq!(findings[1].category, Category::Bug);
        assert_eq!(findings[1].confidence, 1.0);
        assert_eq!(
            dropped,
            vec![
                (2, FindingError::MissingMessage),
                (3, FindingError::Malformed),
                (4, FindingError::Malformed),
            ]
        );
    }

    #[test]
    fn parses_wrapped_findings() {
        let text = r#"{"findings":[{"line":2,"severity":"info","category":"style","confidence":0.95,"message":"x"}]}"#;
        let findings = parse_findings(text).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].file.is_empty());
    }

    #[test]
    fn empty_array_means_no_findings() {
        assert!(parse_findings("  []\n").unwrap().is_empty());
        assert!(parse_findings(r#"{"findings": []}"#).unwrap().is_empty());
        assert!(parse_findings(" {} ").unwrap().is_empty());
    }

    #[test]
    fn error_messages_do_not_repeat_the_cause() {
        let bad = r#"{"file":"a.rs","line":1,"severity":"meh","category":"performance","message":"slow"}"#;
        let err = anyhow::Error::from(parse_findings(bad).unwrap_err());
        let rendered = format!("{:#}", err);
        assert_eq!(rendered.matches("meh").count(), 1, "{}", rendered);
        assert!(rendered.starts_with("response finding is invalid: "));
    }

    #[test]
    fn single_object_is_strict() {
        let ok = r#"{"file":"a.rs","line":1,"severity":"warning","category":"performance","confidence":0.8,"message":"slow"}"#;
        assert_eq!(parse_findings(ok).unwrap().len(), 1);

        let bad = r#"{"file":"a.rs","line":1,"severity":"meh","category":"performance","message":"slow"}"#;
        assert!(matches!(
            parse_findings(bad),
            Err(ParseError::InvalidFinding(FindingError::InvalidSeverity(_)))
        ));
    }

    #[test]
    fn empty_and_garbage_inputs_error() {
        assert!(matches!(parse_findings("   "), Err(ParseError::Empty)));
        assert!(matches!(parse_findings("not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn assign_ids_patches_file_and_is_stable() {
        let findings = parse_findings(
            r#"[{"line":2,"severity":"info","category":"style","confidence":0.95,"message":"x"}]"#,
        )
        .unwrap();
        let first = assign_finding_ids(findings.clone(), "src/x.rs");
        let second = assign_finding_ids(findings, "src/x.rs");

        assert_eq!(first[0].file, "src/x.rs");
        assert!(!first[0].id.is_empty());
        assert_eq!(first[0].id, second[0].id);
        assert!(first[0].validate().is_ok());
    }
}
