//! Confidence and provenance assignment.
//!
//! Confidence is a fixed constant per [`MatchKind`]; it says how strict the
//! match was, not how plausible the value looks. Values failing a structural
//! check never reach this module.

use serde::{Deserialize, Serialize};

use crate::models::record::{CaseId, FieldRecord, FieldValue, Source};

/// How an extracted value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Two labels captured together from one line.
    Combined,
    /// Explicit label, free text value.
    Labeled,
    /// Explicit label, value passed date normalization.
    LabeledDate,
    /// Explicit "Telefone" label with a phone-shaped digit run.
    LabeledPhone,
    /// Tax id whose check digits verified.
    TaxIdChecksum,
    /// Tax id validated by digit count only.
    TaxIdLength,
    /// Largest currency token in the document.
    InferredTotal,
    /// Sum of line-item values.
    ItemSumTotal,
    /// Binary presence flag.
    Presence,
    /// Raw OCR text kept for audit.
    Audit,
}

impl MatchKind {
    pub fn confidence(self) -> f32 {
        match self {
            Self::Combined => 0.9,
            Self::Labeled => 0.85,
            Self::LabeledDate | Self::TaxIdChecksum => 0.8,
            Self::LabeledPhone => 0.7,
            Self::TaxIdLength => 0.55,
            Self::InferredTotal | Self::Presence => 0.5,
            Self::ItemSumTotal => 0.45,
            Self::Audit => 1.0,
        }
    }
}

/// Wraps extracted values into [`FieldRecord`]s for one case.
#[derive(Debug, Clone)]
pub struct ConfidenceAssigner {
    case_id: CaseId,
    writer_id: String,
}

impl ConfidenceAssigner {
    pub fn new(case_id: CaseId, writer_id: impl Into<String>) -> Self {
        Self {
            case_id,
            writer_id: writer_id.into(),
        }
    }

    /// Build a record tagged with the engine's own source.
    pub fn assign(&self, key: &str, value: FieldValue, kind: MatchKind) -> FieldRecord {
        FieldRecord::new(
            self.case_id.clone(),
            key,
            value,
            kind.confidence(),
            Source::Ocr,
            self.writer_id.clone(),
        )
    }
}
