//! Sales-order parser: raw OCR text to an [`ExtractionResult`].

use std::time::Instant;

use tracing::{debug, info};

use super::confidence::{ConfidenceAssigner, MatchKind};
use super::rules::text::preview;
use super::rules::{extract_labels, infer_total, normalize_text, reconstruct_table, LabelOptions};
use crate::models::config::{ExtractionConfig, StoreConfig};
use crate::models::record::{CaseId, Diagnostics, ExtractionResult, FieldValue};

/// Parser for one document's OCR text.
///
/// Stateless between calls; a single instance can serve concurrent passes.
#[derive(Debug, Clone)]
pub struct OrderParser {
    validate_tax_id_checksum: bool,
    preview_lines: usize,
    store_ocr_text: bool,
    writer_id: String,
}

impl OrderParser {
    /// Create a parser with default settings.
    pub fn new() -> Self {
        Self::from_config(&ExtractionConfig::default(), &StoreConfig::default())
    }

    pub fn from_config(extraction: &ExtractionConfig, store: &StoreConfig) -> Self {
        Self {
            validate_tax_id_checksum: extraction.validate_tax_id_checksum,
            preview_lines: extraction.preview_lines,
            store_ocr_text: extraction.store_ocr_text,
            writer_id: store.writer_id.clone(),
        }
    }

    /// Drop CPF/CNPJ values whose check digits fail.
    pub fn with_tax_id_validation(mut self, validate: bool) -> Self {
        self.validate_tax_id_checksum = validate;
        self
    }

    /// Number of normalized lines kept in the preview (0 disables).
    pub fn with_preview_lines(mut self, lines: usize) -> Self {
        self.preview_lines = lines;
        self
    }

    /// Keep the raw text as the `ocr_text` audit field.
    pub fn with_ocr_text(mut self, store: bool) -> Self {
        self.store_ocr_text = store;
        self
    }

    /// Run one extraction pass.
    ///
    /// Always produces a result; fields that could not be found are simply
    /// missing from it.
    pub fn parse(&self, case_id: &CaseId, text: &str) -> ExtractionResult {
        let start = Instant::now();
        let lines = normalize_text(text);
        info!("Parsing case {}: {} lines", case_id, lines.len());

        let assigner = ConfidenceAssigner::new(case_id.clone(), self.writer_id.clone());
        let options = LabelOptions {
            validate_tax_id_checksum: self.validate_tax_id_checksum,
        };

        let mut fields: Vec<_> = extract_labels(&lines, options)
            .into_iter()
            .map(|o| assigner.assign(o.key, o.value, o.kind))
            .collect();

        let table = reconstruct_table(&lines);
        let items = table.to_items(case_id);

        let total = infer_total(&lines, &items);
        if let Some(total) = &total {
            debug!("Total {} from {:?} ({})", total.value, total.kind, total.matched);
            fields.push(assigner.assign(
                "total",
                FieldValue::Text(format!("{:.2}", total.value.round_dp(2))),
                total.kind,
            ));
        }

        if self.store_ocr_text && !text.trim().is_empty() {
            fields.push(assigner.assign("ocr_text", FieldValue::text(text), MatchKind::Audit));
        }

        let diagnostics = Diagnostics {
            lines_total: lines.len(),
            table_found: table.header_line.is_some(),
            rows_parsed: table.rows.len(),
            rows_rejected: table.rows_rejected,
        };

        info!(
            "Parsed case {} in {}ms: {} fields, {} rows ({} rejected)",
            case_id,
            start.elapsed().as_millis(),
            fields.len(),
            diagnostics.rows_parsed,
            diagnostics.rows_rejected
        );

        ExtractionResult {
            case_id: case_id.clone(),
            fields,
            items,
            total: total.map(|t| t.value),
            diagnostics,
            preview: preview(&lines, self.preview_lines),
        }
    }
}

impl Default for OrderParser {
    fn default() -> Self {
        Self::new()
    }
}
