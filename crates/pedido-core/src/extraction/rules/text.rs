//! Line splitting and match-oriented normalization of OCR text.

use std::ops::Range;

/// One non-empty line of OCR text.
///
/// `normalized` is lowercase, diacritic-free and whitespace-collapsed, for
/// matching. `text` is the trimmed original, for display. Byte ranges found
/// in `normalized` map back to `text` through [`NormalizedLine::original`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// Position in the normalized line list (0-based).
    pub index: usize,
    /// Trimmed original line.
    pub text: String,
    /// Match-oriented form.
    pub normalized: String,
    /// `offsets[i]` is the byte offset in `text` of the character that
    /// produced byte `i` of `normalized`; the last entry is `text.len()`.
    offsets: Vec<usize>,
}

impl NormalizedLine {
    pub fn new(index: usize, line: &str) -> Self {
        let text = line.trim().to_string();
        let mut normalized = String::with_capacity(text.len());
        let mut offsets = Vec::with_capacity(text.len() + 1);
        let mut space_start: Option<usize> = None;

        for (pos, c) in text.char_indices() {
            if c.is_whitespace() {
                space_start.get_or_insert(pos);
                continue;
            }
            if let Some(start) = space_start.take() {
                if !normalized.is_empty() {
                    normalized.push(' ');
                    offsets.push(start);
                }
            }
            for lower in c.to_lowercase() {
                if is_combining_mark(lower) {
                    continue;
                }
                let folded = fold(lower);
                normalized.push(folded);
                offsets.extend(std::iter::repeat_n(pos, folded.len_utf8()));
            }
        }
        offsets.push(text.len());

        Self {
            index,
            text,
            normalized,
            offsets,
        }
    }

    /// Slice of the original line covering a byte range of `normalized`,
    /// trimmed.
    pub fn original(&self, range: Range<usize>) -> &str {
        let start = self.offsets.get(range.start).copied().unwrap_or(self.text.len());
        let end = self.offsets.get(range.end).copied().unwrap_or(self.text.len());
        if start >= end {
            return "";
        }
        self.text[start..end].trim()
    }

    /// Original text from a byte offset of `normalized` to the end of line.
    pub fn original_from(&self, start: usize) -> &str {
        self.original(start..self.normalized.len())
    }
}

/// Split raw OCR text into trimmed, non-empty, normalized lines.
///
/// Line order is preserved. Always succeeds; empty input yields no lines.
pub fn normalize_text(raw: &str) -> Vec<NormalizedLine> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(i, l)| NormalizedLine::new(i, l))
        .collect()
}

/// First `n` normalized lines, for debugging output.
pub fn preview(lines: &[NormalizedLine], n: usize) -> Vec<String> {
    lines.iter().take(n).map(|l| l.normalized.clone()).collect()
}

/// Normalize a single string the same way lines are normalized.
pub fn normalize(s: &str) -> String {
    NormalizedLine::new(0, s).normalized
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036f}')
}

/// Fold a lowercase Latin letter to its unaccented ASCII base.
fn fold(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'ª' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'º' | '°' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
