//! Amount parsing and order total inference (pt-BR format).

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{MONEY_STRICT, NUMERIC_RUN};
use super::text::NormalizedLine;
use super::{ExtractionMatch, FieldExtractor};
use crate::extraction::confidence::MatchKind;
use crate::models::record::LineItem;

/// Currency token extractor.
///
/// A token is a maximal run of digits, dots and commas standing on its own
/// (no letter or digit glued to either side). The whole run must be pt-BR
/// money; `16,027,00` or `1.234.56,78` yield nothing rather than the
/// `027,00` or `56,78` inside them. A single trailing `.` or `,` is taken as
/// punctuation.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        NUMERIC_RUN
            .find_iter(text)
            .filter(|m| {
                let before = text[..m.start()].chars().next_back();
                let after = text[m.end()..].chars().next();
                !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
            })
            .filter_map(|m| {
                let run = m.as_str();
                let token = run.strip_suffix(['.', ',']).unwrap_or(run);
                parse_brl(token).map(|amount| {
                    ExtractionMatch::new(amount, MatchKind::InferredTotal, token)
                        .with_position(m.start(), m.start() + token.len())
                })
            })
            .collect()
    }
}

/// Parse a pt-BR money token (`16.027,00`).
///
/// Only the exact `d{1,3}(.ddd)*,dd` shape is accepted; anything else is
/// rejected, never partially parsed.
pub fn parse_brl(token: &str) -> Option<Decimal> {
    let token = token.trim();
    if !MONEY_STRICT.is_match(token) {
        return None;
    }
    let normalized = token.replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).ok()
}

/// Format an amount in pt-BR style (`16.027,00`).
pub fn format_brl(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.abs().round_dp(2));
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{},{}", formatted, decimal_part)
}

/// Infer the order total.
///
/// The largest currency token anywhere in the document wins. Without any
/// token, the sum of line-item values is used; a zero sum yields `None`.
pub fn infer_total(
    lines: &[NormalizedLine],
    items: &[LineItem],
) -> Option<ExtractionMatch<Decimal>> {
    let extractor = AmountExtractor::new();
    let largest = lines
        .iter()
        .flat_map(|line| extractor.extract_all(&line.text))
        .max_by(|a, b| a.value.cmp(&b.value));

    if largest.is_some() {
        return largest;
    }

    let sum: Decimal = items.iter().filter_map(|i| i.value_num).sum();
    if sum.is_zero() {
        None
    } else {
        Some(ExtractionMatch::new(sum, MatchKind::ItemSumTotal, "line items"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::rules::text::normalize_text;
    use crate::models::record::CaseId;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_brl() {
        assert_eq!(parse_brl("16.027,00"), Some(dec("16027.00")));
        assert_eq!(parse_brl("1.200,00"), Some(dec("1200.00")));
        assert_eq!(parse_brl("0,99"), Some(dec("0.99")));
        assert_eq!(parse_brl("1.234.567,89"), Some(dec("1234567.89")));
    }

    #[test]
    fn test_parse_brl_rejects_other_shapes() {
        assert_eq!(parse_brl("1200,00"), None);
        assert_eq!(parse_brl("1,200.00"), None);
        assert_eq!(parse_brl("12.00"), None);
        assert_eq!(parse_brl("1.20,00"), None);
        assert_eq!(parse_brl("R$ 10,00"), None);
        assert_eq!(parse_brl("10,0"), None);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec("16027.00")), "16.027,00");
        assert_eq!(format_brl(dec("1234567.8")), "1.234.567,80");
        assert_eq!(format_brl(dec("5")), "5,00");
        assert_eq!(format_brl(dec("-1500")), "-1.500,00");
    }

    #[test]
    fn test_money_round_trip() {
        for s in ["16027.00", "0.01", "999.99", "1000.00", "123456789.12"] {
            let x = dec(s);
            assert_eq!(parse_brl(&format_brl(x)), Some(x), "{}", s);
        }
    }

    #[test]
    fn test_extract_all_amounts() {
        let results = AmountExtractor::new().extract_all("Entrada 1.500,00 saldo 14.527,00 em 05/01/26");
        let values: Vec<Decimal> = results.iter().map(|m| m.value).collect();
        assert_eq!(values, vec![dec("1500.00"), dec("14527.00")]);
    }

    #[test]
    fn test_malformed_runs_yield_no_amount() {
        let extractor = AmountExtractor::new();
        for text in ["Sinal 16,027,00", "Total 1.234.56,78", "ref A1.200,00", "cod 1.200,00X", "12.345,678"] {
            assert!(extractor.extract_all(text).is_empty(), "{}", text);
        }
    }

    #[test]
    fn test_amount_before_punctuation() {
        let results = AmountExtractor::new().extract_all("Total: R$1.200,00. Pago (350,00)");
        let values: Vec<&str> = results.iter().map(|m| m.matched.as_str()).collect();
        assert_eq!(values, vec!["1.200,00", "350,00"]);
        assert_eq!(results[0].position, Some((9, 17)));
    }

    #[test]
    fn test_total_ignores_malformed_amount() {
        let lines = normalize_text("Sinal 16,027,00\n");
        assert!(infer_total(&lines, &[]).is_none());

        let lines = normalize_text("Sinal 16,027,00\nEntrada 500,00\n");
        assert_eq!(infer_total(&lines, &[]).unwrap().value, dec("500.00"));
    }

    #[test]
    fn test_total_is_largest_token() {
        let lines = normalize_text("Sinal 1.500,00\nTotal 16.027,00\n");
        let total = infer_total(&lines, &[]).unwrap();
        assert_eq!(total.value, dec("16027.00"));
        assert_eq!(total.kind, MatchKind::InferredTotal);
    }

    #[test]
    fn test_total_falls_back_to_item_sum() {
        let lines = normalize_text("sem valores aqui");
        let item = |n: u32, v: Option<&str>| LineItem {
            case_id: CaseId::new("c"),
            line_no: n,
            code: None,
            description: "x".to_string(),
            qty: None,
            value_raw: None,
            value_num: v.map(dec),
        };
        let items = vec![item(1, Some("10.50")), item(2, None), item(3, Some("4.50"))];
        let total = infer_total(&lines, &items).unwrap();
        assert_eq!(total.value, dec("15.00"));
        assert_eq!(total.kind, MatchKind::ItemSumTotal);

        assert!(infer_total(&lines, &[]).is_none());
        assert!(infer_total(&lines, &[item(1, None)]).is_none());
    }
}
