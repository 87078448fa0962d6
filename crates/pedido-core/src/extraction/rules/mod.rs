//! Rule-based field extractors for Brazilian sales-order forms.

pub mod amounts;
pub mod dates;
pub mod documents;
pub mod labels;
pub mod patterns;
pub mod table;
pub mod text;

pub use amounts::{format_brl, infer_total, parse_brl, AmountExtractor};
pub use dates::{find_date, parse_date, DateExtractor};
pub use documents::{classify_tax_id, validate_cnpj, validate_cpf, TaxIdKind};
pub use labels::{extract_labels, LabelOptions, LabelOutcome};
pub use table::{reconstruct_table, TableRow, TableState, TableSummary};
pub use text::{normalize_text, NormalizedLine};

use super::confidence::MatchKind;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract all occurrences of the field, in text order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extracted value and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// How the value was matched; fixes its confidence.
    pub kind: MatchKind,
    /// Byte range of `matched` in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub matched: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, kind: MatchKind, matched: impl Into<String>) -> Self {
        Self {
            value,
            kind,
            position: None,
            matched: matched.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    /// Confidence score (0.0 - 1.0).
    pub fn confidence(&self) -> f32 {
        self.kind.confidence()
    }
}
