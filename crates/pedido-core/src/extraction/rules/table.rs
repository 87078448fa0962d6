//! Item table reconstruction from delimiter-free OCR lines.
//!
//! The table region starts after a header line carrying both a code and a
//! description column label, and ends at the payment terms footer or at the
//! end of the text. Inside it, a line starting with a short alphanumeric code
//! and holding a money token opens a new row; any other line continues the
//! open row's description, which is how handwritten multi-line descriptions
//! survive OCR.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::amounts::{parse_brl, AmountExtractor};
use super::patterns::{
    PAYMENT_FOOTER, ROW_CODE, ROW_TRAILING_MONEY, ROW_TRAILING_QTY, TABLE_CODE_TOKEN,
    TABLE_COLUMN_HINT, TABLE_DESCRIPTION_TOKEN,
};
use super::text::NormalizedLine;
use super::FieldExtractor;
use crate::models::record::{CaseId, LineItem};

/// Reconstructor state.
///
/// Transitions: `Searching -> InTable` on a header line; `InTable -> Done` on
/// the payment terms footer or when lines run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Searching,
    InTable,
    Done,
}

/// A reconstructed row before it is attached to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub code: Option<String>,
    pub description: String,
    pub qty: Option<u32>,
    pub value_raw: Option<String>,
    pub value_num: Option<Decimal>,
    /// Index of the line that opened the row.
    pub first_line: usize,
}

impl TableRow {
    fn description_only(line: &NormalizedLine) -> Self {
        Self {
            code: None,
            description: collapse(&line.text),
            qty: None,
            value_raw: None,
            value_num: None,
            first_line: line.index,
        }
    }

    fn push_line(&mut self, text: &str) {
        let text = collapse(text);
        if self.description.is_empty() {
            self.description = text;
        } else {
            self.description.push('\n');
            self.description.push_str(&text);
        }
    }
}

/// Output of one table pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSummary {
    /// Kept rows in output order.
    pub rows: Vec<TableRow>,
    /// Index of the header line, if one was found.
    pub header_line: Option<usize>,
    /// Index of the footer line, if one was found.
    pub footer_line: Option<usize>,
    /// Rows dropped because their description was empty.
    pub rows_rejected: usize,
}

impl TableSummary {
    /// Attach rows to a case, numbering them from 1.
    pub fn to_items(&self, case_id: &CaseId) -> Vec<LineItem> {
        self.rows
            .iter()
            .zip(1u32..)
            .map(|(row, line_no)| LineItem {
                case_id: case_id.clone(),
                line_no,
                code: row.code.clone(),
                description: row.description.clone(),
                qty: row.qty,
                value_raw: row.value_raw.clone(),
                value_num: row.value_num,
            })
            .collect()
    }
}

/// Rebuild the item table from normalized lines.
///
/// A missing header yields an empty table, not an error.
pub fn reconstruct_table(lines: &[NormalizedLine]) -> TableSummary {
    let mut summary = TableSummary::default();
    let mut state = TableState::Searching;
    let mut open: Option<TableRow> = None;

    for line in lines {
        match state {
            TableState::Searching => {
                if is_header(line) {
                    debug!("Item table header at line {}", line.index);
                    summary.header_line = Some(line.index);
                    state = TableState::InTable;
                }
            }
            TableState::InTable => {
                if PAYMENT_FOOTER.is_match(&line.normalized) {
                    debug!("Item table footer at line {}", line.index);
                    summary.footer_line = Some(line.index);
                    flush(&mut summary, open.take());
                    state = TableState::Done;
                } else if let Some(row) = parse_row_start(line) {
                    flush(&mut summary, open.replace(row));
                } else if let Some(row) = open.as_mut() {
                    row.push_line(&line.text);
                } else if !TABLE_COLUMN_HINT.is_match(&line.normalized) {
                    open = Some(TableRow::description_only(line));
                } else {
                    debug!("Skipping column header line {}", line.index);
                }
            }
            TableState::Done => break,
        }
    }

    if state == TableState::InTable {
        flush(&mut summary, open.take());
    }

    summary
}

fn is_header(line: &NormalizedLine) -> bool {
    TABLE_CODE_TOKEN.is_match(&line.normalized)
        && TABLE_DESCRIPTION_TOKEN.is_match(&line.normalized)
}

fn flush(summary: &mut TableSummary, row: Option<TableRow>) {
    let Some(mut row) = row else {
        return;
    };
    row.description = row.description.trim().to_string();
    if row.description.is_empty() {
        debug!("Rejecting row opened at line {}: empty description", row.first_line);
        summary.rows_rejected += 1;
        return;
    }
    debug!(
        "Row {}: code={:?} qty={:?} value={:?}",
        summary.rows.len() + 1,
        row.code,
        row.qty,
        row.value_raw
    );
    summary.rows.push(row);
}

/// Parse a line that opens a new row: `<code> <description> [qty] [unit] <value>`.
fn parse_row_start(line: &NormalizedLine) -> Option<TableRow> {
    let caps = ROW_CODE.captures(&line.text)?;
    let code = caps.get(1)?.as_str().to_string();
    let rest = &line.text[caps.get(0)?.end()..];

    if AmountExtractor::new().extract_all(rest).is_empty() {
        return None;
    }

    let (description, qty, value_raw) = split_row_tail(rest);
    let value_num = value_raw.as_deref().and_then(parse_brl);

    Some(TableRow {
        code: Some(code),
        description,
        qty,
        value_raw,
        value_num,
        first_line: line.index,
    })
}

/// Strip the trailing value columns off a row body.
///
/// The last money token is the row value. A money token right before it is a
/// unit price and is dropped; an integer right before those is the quantity.
/// When the money token is not at the end of the line it is cut out in place
/// and no quantity is read.
fn split_row_tail(body: &str) -> (String, Option<u32>, Option<String>) {
    let mut rest = body.trim_end();

    if let Some(caps) = ROW_TRAILING_MONEY.captures(rest) {
        let value = caps[1].to_string();
        rest = rest[..caps.get(0).map_or(0, |m| m.start())].trim_end();

        if let Some(unit_price) = ROW_TRAILING_MONEY.captures(rest) {
            rest = rest[..unit_price.get(0).map_or(0, |m| m.start())].trim_end();
        }

        let mut qty = None;
        if let Some(caps) = ROW_TRAILING_QTY.captures(rest) {
            qty = caps[1].parse().ok();
            rest = rest[..caps.get(0).map_or(0, |m| m.start())].trim_end();
        }

        return (collapse(rest), qty, Some(value));
    }

    let last = AmountExtractor::new().extract_all(rest).pop();
    match last.and_then(|m| m.position.map(|span| (span, m.matched))) {
        Some(((start, end), matched)) => {
            let description = format!("{} {}", &rest[..start], &rest[end..]);
            (collapse(&description), None, Some(matched))
        }
        None => (collapse(rest), None, None),
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
