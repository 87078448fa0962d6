//! Date normalization for Brazilian forms.
//!
//! Dates are canonicalized to `dd/mm/yyyy` strings. Calendar correctness is
//! not checked: `31/04/2026` passes through unchanged.

use super::patterns::{DATE_ANY, DATE_STRICT};
use super::{ExtractionMatch, FieldExtractor};
use crate::extraction::confidence::MatchKind;

/// Date field extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<String>;

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DATE_ANY
            .captures_iter(text)
            .filter_map(|caps| {
                let full_match = caps.get(0)?;
                let date = canonical(&caps[1], &caps[2], &caps[3])?;
                Some(
                    ExtractionMatch::new(date, MatchKind::LabeledDate, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }
}

/// Parse a whole token as a date (`d{1,2} sep d{1,2} sep d{2,4}`, `sep` in
/// `/` or `-`).
pub fn parse_date(token: &str) -> Option<String> {
    let caps = DATE_STRICT.captures(token.trim())?;
    canonical(&caps[1], &caps[2], &caps[3])
}

/// Find the first date anywhere in `text`.
pub fn find_date(text: &str) -> Option<String> {
    DateExtractor::new().extract_all(text).into_iter().next().map(|m| m.value)
}

fn canonical(day: &str, month: &str, year: &str) -> Option<String> {
    let year = match year.len() {
        2 => format!("20{}", year),
        4 => year.to_string(),
        // A 3-digit year cannot be expanded unambiguously.
        _ => return None,
    };
    Some(format!("{:0>2}/{:0>2}/{}", day, month, year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_digit_year_expands() {
        assert_eq!(parse_date("05/01/26"), Some("05/01/2026".to_string()));
    }

    #[test]
    fn test_pads_and_accepts_dashes() {
        assert_eq!(parse_date("5-1-2026"), Some("05/01/2026".to_string()));
        assert_eq!(parse_date("5/1-26"), Some("05/01/2026".to_string()));
    }

    #[test]
    fn test_no_calendar_validation() {
        assert_eq!(parse_date("31/04/2026"), Some("31/04/2026".to_string()));
        assert_eq!(parse_date("99/99/99"), Some("99/99/2099".to_string()));
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert_eq!(parse_date("2026-01-05"), None);
        assert_eq!(parse_date("05.01.2026"), None);
        assert_eq!(parse_date("05/01/202"), None);
        assert_eq!(parse_date("05/01"), None);
        assert_eq!(parse_date("amanha"), None);
    }

    #[test]
    fn test_find_date_in_text() {
        assert_eq!(
            find_date("Entrega prevista 12/02/26 pela manhã"),
            Some("12/02/2026".to_string())
        );
        assert_eq!(find_date("sem data"), None);
    }
}
