//! Review findings: the record a reviewer reports, its validation rules and
//! its stable identity.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Number of ID characters shown to humans
pub const DISPLAY_ID_LEN: usize = 7;

/// Number of hex characters in a full finding ID
const STABLE_ID_LEN: usize = 32;

/// How serious a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    #[default]
    Warning,
    Info,
    Nitpick,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Nitpick => "nitpick",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            "nitpick" => Some(Severity::Nitpick),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What kind of problem a finding describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[default]
    Bug,
    Security,
    Correctness,
    Performance,
    Style,
    Maintainability,
    BestPractice,
    Testing,
    Documentation,
    Design,
    Accessibility,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Bug,
        Category::Security,
        Category::Correctness,
        Category::Performance,
        Category::Style,
        Category::Maintainability,
        Category::BestPractice,
        Category::Testing,
        Category::Documentation,
        Category::Design,
        Category::Accessibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bug => "bug",
            Category::Security => "security",
            Category::Correctness => "correctness",
            Category::Performance => "performance",
            Category::Style => "style",
            Category::Maintainability => "maintainability",
            Category::BestPractice => "best_practice",
            Category::Testing => "testing",
            Category::Documentation => "documentation",
            Category::Design => "design",
            Category::Accessibility => "accessibility",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|c| c.as_str() == key)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive line range in the new file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    /// Whether this range intersects `[start, end]`
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start <= end && self.end >= start
    }
}

/// Why a finding failed validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FindingError {
    #[error("finding is null or not an object")]
    Malformed,

    #[error("file is required")]
    MissingFile,

    #[error("message is required")]
    MissingMessage,

    #[error("invalid severity {0:?}")]
    InvalidSeverity(String),

    #[error("invalid category {0:?}")]
    InvalidCategory(String),

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),

    #[error("range start {start} is after end {end}")]
    InvertedRange { start: u32, end: u32 },
}

/// One issue reported against a diff hunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Repository-relative path
    #[serde(default)]
    pub file: String,

    /// 1-based line in the new file; 0 means the finding is about the whole file
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<LineRange>,

    pub severity: Severity,

    pub category: Category,

    pub confidence: f64,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_uri: Option<String>,

    #[serde(
        default,
        deserialize_with = "deserialize_evidence_lines",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub evidence_lines: Vec<u32>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl Finding {
    /// Full validation for findings that are stored or displayed.
    pub fn validate(&self) -> Result<(), FindingError> {
        if self.file.trim().is_empty() {
            return Err(FindingError::MissingFile);
        }
        self.validate_reported()
    }

    /// Validation for freshly reported findings, whose `file` may still be
    /// blank until it is patched from the hunk.
    pub fn validate_reported(&self) -> Result<(), FindingError> {
        if self.message.trim().is_empty() {
            return Err(FindingError::MissingMessage);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(FindingError::ConfidenceOutOfRange(self.confidence));
        }
        if let Some(range) = self.range {
            if !range.is_valid() {
                return Err(FindingError::InvertedRange {
                    start: range.start,
                    end: range.end,
                });
            }
        }
        Ok(())
    }

    /// Deterministic ID for this finding's file, location and message.
    pub fn stable_id(&self) -> String {
        stable_id(&self.file, self.line, self.range, &self.message)
    }

    /// Short form of the ID for display
    pub fn display_id(&self) -> &str {
        display_id(&self.id)
    }

    /// The line used to locate this finding: range start when present, else `line`.
    pub fn location(&self) -> u32 {
        match self.range {
            Some(range) => range.start,
            None => self.line,
        }
    }

    /// Whether the finding refers to the file as a whole
    pub fn is_file_level(&self) -> bool {
        self.line == 0 && self.range.is_none()
    }

    /// Line span covered by this finding, if it has one.
    pub fn span(&self) -> Option<(u32, u32)> {
        match self.range {
            Some(range) if range.is_valid() => Some((range.start, range.end)),
            Some(_) => None,
            None if self.line > 0 => Some((self.line, self.line)),
            None => None,
        }
    }
}

/// Deterministic hex ID derived from `(file, line, range.start, range.end, message)`.
pub fn stable_id(file: &str, line: u32, range: Option<LineRange>, message: &str) -> String {
    let (start, end) = range.map(|r| (r.start, r.end)).unwrap_or((0, 0));

    let parts = [
        file.to_string(),
        line.to_string(),
        start.to_string(),
        end.to_string(),
        message.to_string(),
    ];

    let mut hasher = Sha256::new();
    for part in &parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let hash_hex = format!("{:x}", hasher.finalize());
    hash_hex[..STABLE_ID_LEN].to_string()
}

/// First [`DISPLAY_ID_LEN`] characters of an ID
pub fn display_id(id: &str) -> &str {
    id.get(..DISPLAY_ID_LEN).unwrap_or(id)
}

/// A finding as decoded from model output, before normalization.
///
/// Every field is optional so that sloppy output still decodes; turning it
/// into a [`Finding`] either coerces ([`RawFinding::normalize`]) or rejects
/// ([`RawFinding::into_strict`]) bad enum values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFinding {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<i64>,
    #[serde(default)]
    pub range: Option<RawRange>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub cursor_uri: Option<String>,
    #[serde(default, deserialize_with = "deserialize_evidence_lines")]
    pub evidence_lines: Vec<u32>,
}

/// Range as it appears on the wire (may be negative)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawRange {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
}

fn clamp_line(n: i64) -> u32 {
    n.clamp(0, u32::MAX as i64) as u32
}

impl RawFinding {
    /// Coerce unknown severity to `warning` and unknown category to `bug`,
    /// then validate what remains.
    pub fn normalize(self) -> Result<Finding, FindingError> {
        let severity = self
            .severity
            .as_deref()
            .and_then(Severity::from_str)
            .unwrap_or(Severity::Warning);
        let category = self
            .category
            .as_deref()
            .and_then(Category::from_str)
            .unwrap_or(Category::Bug);
        self.build(severity, category)
    }

    /// Convert without any coercion: severity and category must already be valid.
    pub fn into_strict(self) -> Result<Finding, FindingError> {
        let raw_severity = self.severity.clone().unwrap_or_default();
        let severity = Severity::from_str(&raw_severity)
            .ok_or(FindingError::InvalidSeverity(raw_severity))?;
        let raw_category = self.category.clone().unwrap_or_default();
        let category = Category::from_str(&raw_category)
            .ok_or(FindingError::InvalidCategory(raw_category))?;
        self.build(severity, category)
    }

    fn build(self, severity: Severity, category: Category) -> Result<Finding, FindingError> {
        let finding = Finding {
            id: self.id.unwrap_or_default().trim().to_string(),
            file: self.file.unwrap_or_default().trim().to_string(),
            line: self.line.map(clamp_line).unwrap_or(0),
            range: self
                .range
                .map(|r| LineRange::new(clamp_line(r.start), clamp_line(r.end))),
            severity,
            category,
            confidence: self.confidence.unwrap_or(1.0),
            message: self.message.unwrap_or_default().trim().to_string(),
            suggestion: self
                .suggestion
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            cursor_uri: self.cursor_uri.filter(|s| !s.trim().is_empty()),
            evidence_lines: self.evidence_lines,
        };
        finding.validate_reported()?;
        Ok(finding)
    }
}

/// Accepts either `[10, 12]` or `"10, 12"`; the list shape is tried first.
fn deserialize_evidence_lines<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum EvidenceLines {
        List(Vec<u32>),
        Text(String),
    }

    match Option::<EvidenceLines>::deserialize(deserializer)? {
        None => Ok(Vec::new()),
        Some(EvidenceLines::List(lines)) => Ok(lines),
        Some(EvidenceLines::Text(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>().map_err(|_| {
                    serde::de::Error::custom(format!("invalid evidence line {:?}", s))
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(file: &str, line: u32, message: &str) -> Finding {
        Finding {
            file: file.to_string(),
            line,
            message: message.to_string(),
            confidence: 0.9,
            ..Default::default()
        }
    }

    #[test]
    fn validate_rejects_missing_fields() {
        assert_eq!(finding("", 1, "msg").validate(), Err(FindingError::MissingFile));
        assert_eq!(finding("a.rs", 1, "  ").validate(), Err(FindingError::MissingMessage));
        assert!(finding("a.rs", 1, "msg").validate().is_ok());
    }

    #[test]
    fn validate_rejects_confidence_and_inverted_range() {
        let mut f = finding("a.rs", 1, "msg");
        f.confidence = 1.5;
        assert_eq!(f.validate(), Err(FindingError::ConfidenceOutOfRange(1.5)));

        let mut f = finding("a.rs", 1, "msg");
        f.range = Some(LineRange::new(9, 3));
        assert_eq!(f.validate(), Err(FindingError::InvertedRange { start: 9, end: 3 }));
    }

    #[test]
    fn stable_id_is_deterministic_and_location_sensitive() {
        let a = finding("src/lib.rs", 10, "possible overflow");
        let b = finding("src/lib.rs", 10, "possible overflow");
        let c = finding("src/lib.rs", 11, "possible overflow");

        assert_eq!(a.stable_id(), b.stable_id());
        assert_ne!(a.stable_id(), c.stable_id());
        assert_eq!(a.stable_id().len(), 32);
        assert!(a.stable_id().chars().all(|ch| ch.is_ascii_hexdigit()));

        let mut ranged = a.clone();
        ranged.range = Some(LineRange::new(10, 12));
        assert_ne!(a.stable_id(), ranged.stable_id());
    }

    #[test]
    fn stable_id_treats_missing_range_as_zero() {
        let id = stable_id("f.go", 1, None, "msg");
        assert_eq!(id, stable_id("f.go", 1, Some(LineRange::new(0, 0)), "msg"));
    }

    #[test]
    fn display_id_is_seven_chars() {
        let mut f = finding("a.rs", 1, "msg");
        f.id = f.stable_id();
        assert_eq!(f.display_id().len(), DISPLAY_ID_LEN);
        assert!(f.id.starts_with(f.display_id()));
        assert_eq!(display_id("abc"), "abc");
    }

    #[test]
    fn normalize_coerces_enums() {
        let raw = RawFinding {
            file: Some("a.rs".to_string()),
            severity: Some("catastrophic".to_string()),
            category: Some("vibes".to_string()),
            message: Some("something".to_string()),
            ..Default::default()
        };
        let f = raw.normalize().expect("normalize");
        assert_eq!(f.severity, Severity::Warning);
        assert_eq!(f.category, Category::Bug);
        assert_eq!(f.confidence, 1.0);
    }

    #[test]
    fn strict_conversion_rejects_bad_enums() {
        let raw = RawFinding {
            file: Some("a.rs".to_string()),
            severity: Some("catastrophic".to_string()),
            category: Some("bug".to_string()),
            message: Some("something".to_string()),
            ..Default::default()
        };
        assert_eq!(
            raw.into_strict().unwrap_err(),
            FindingError::InvalidSeverity("catastrophic".to_string())
        );
    }

    #[test]
    fn category_accepts_hyphenated_spelling() {
        assert_eq!(Category::from_str("best-practice"), Some(Category::BestPractice));
        assert_eq!(Category::from_str("Best_Practice"), Some(Category::BestPractice));
        assert_eq!(Category::from_str("nope"), None);
    }

    #[test]
    fn evidence_lines_accepts_list_or_string() {
        let from_list: Finding = serde_json::from_str(
            r#"{"file":"a","severity":"info","category":"bug","confidence":1,"message":"m","evidence_lines":[10,12]}"#,
        )
        .unwrap();
        let from_text: Finding = serde_json::from_str(
            r#"{"file":"a","severity":"info","category":"bug","confidence":1,"message":"m","evidence_lines":"10, 12"}"#,
        )
        .unwrap();
        assert_eq!(from_list.evidence_lines, vec![10, 12]);
        assert_eq!(from_text.evidence_lines, vec![10, 12]);

        let encoded = serde_json::to_value(&from_text).unwrap();
        assert_eq!(encoded["evidence_lines"], serde_json::json!([10, 12]));
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let f = finding("a.rs", 0, "msg");
        let encoded = serde_json::to_value(&f).unwrap();
        let obj = encoded.as_object().unwrap();
        for key in ["id", "line", "range", "suggestion", "cursor_uri", "evidence_lines"] {
            assert!(!obj.contains_key(key), "{} should be omitted", key);
        }
    }

    #[test]
    fn span_prefers_valid_range() {
        let mut f = finding("a.rs", 4, "msg");
        assert_eq!(f.span(), Some((4, 4)));
        f.range = Some(LineRange::new(2, 6));
        assert_eq!(f.span(), Some((2, 6)));
        assert_eq!(f.location(), 2);
        f.range = Some(LineRange::new(6, 2));
        assert_eq!(f.span(), None);
        assert!(finding("a.rs", 0, "msg").is_file_level());
    }
}
