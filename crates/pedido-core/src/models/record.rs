//! Structured records produced by an extraction pass.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque identifier of the case that owns extracted records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Value held by a [`FieldRecord`].
///
/// Serialized untagged: `null`, a JSON string, or any other JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Nothing was extracted. Never overwrites a stored value.
    Null,
    /// Short text.
    Text(String),
    /// Embedded structured value (coordinates, flags, ...).
    Structured(serde_json::Value),
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Whether this value carries nothing worth writing.
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Structured(v) => v.is_null(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => f.write_str(s),
            Self::Structured(v) => write!(f, "{}", v),
        }
    }
}

/// Provenance tag naming the actor that last wrote a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    /// This engine.
    Ocr,
    /// Data entered by the vendor.
    Vendor,
    /// Data entered manually by an administrator.
    Admin,
    /// Any other actor.
    Other(String),
}

impl Source {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ocr => "ocr",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ocr" => Self::Ocr,
            "vendor" => Self::Vendor,
            "admin" => Self::Admin,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for Source {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Source> for String {
    fn from(s: Source) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named scalar value attached to a case. Unique per `(case_id, key)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub case_id: CaseId,
    pub key: String,
    pub value: FieldValue,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    pub source: Source,
    pub last_updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl FieldRecord {
    pub fn new(
        case_id: CaseId,
        key: impl Into<String>,
        value: FieldValue,
        confidence: f32,
        source: Source,
        last_updated_by: impl Into<String>,
    ) -> Self {
        Self {
            case_id,
            key: key.into(),
            value,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            last_updated_by: last_updated_by.into(),
            updated_at: Utc::now(),
        }
    }
}

/// One reconstructed row of an order's item table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub case_id: CaseId,
    /// 1-based position in the reconstructed table.
    pub line_no: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Description; continuation lines are joined with `\n`.
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<u32>,
    /// Money token exactly as printed (`1.200,00`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_num: Option<Decimal>,
}

/// Counters describing one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Non-empty lines after normalization.
    pub lines_total: usize,
    /// Whether an item-table header was found.
    pub table_found: bool,
    /// Rows kept by the table reconstructor.
    pub rows_parsed: usize,
    /// Rows discarded for an empty description.
    pub rows_rejected: usize,
}

/// Aggregate output of one extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub case_id: CaseId,
    pub fields: Vec<FieldRecord>,
    pub items: Vec<LineItem>,
    /// Inferred order total.
    pub total: Option<Decimal>,
    pub diagnostics: Diagnostics,
    /// Leading normalized lines, for debugging.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<String>,
}

impl ExtractionResult {
    /// Look up an extracted field by key.
    pub fn field(&self, key: &str) -> Option<&FieldRecord> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Text value of an extracted field.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(|f| f.value.as_text())
    }
}
