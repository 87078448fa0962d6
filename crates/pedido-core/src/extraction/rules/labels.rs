//! Label/value extraction driven by an ordered rule table.
//!
//! Each rule pairs a label pattern with a post-processing step. Combined
//! rules (two labels printed on one line) run first; keys they fill are not
//! scanned again by the single-label rules, so a later unrelated occurrence
//! of the second label cannot win. Adding a field means adding a row to
//! [`SINGLE_RULES`].

use std::collections::HashSet;
use std::ops::Range;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use super::dates::find_date;
use super::documents::{classify_tax_id, validate};
use super::patterns::*;
use super::text::NormalizedLine;
use crate::extraction::confidence::MatchKind;
use crate::models::record::FieldValue;

/// A value found for a field key.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOutcome {
    pub key: &'static str,
    pub value: FieldValue,
    pub kind: MatchKind,
    /// Index of the line the value came from.
    pub line: usize,
}

/// Options affecting post-processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelOptions {
    /// Drop CPF/CNPJ values whose check digits fail.
    pub validate_tax_id_checksum: bool,
}

/// Post-processing applied to a captured value.
#[derive(Debug, Clone, Copy)]
enum Post {
    /// Free text, whitespace collapsed.
    Text,
    /// First whitespace-separated token.
    FirstToken,
    /// Free text cut before a trailing label.
    CutAt(&'static Regex),
    /// First date in the value, canonicalized.
    Date,
    /// Two-letter state code, uppercased.
    State,
    /// 8-digit postal code.
    Cep,
    /// CPF or CNPJ by digit count; overrides the key.
    TaxId,
    /// Phone-shaped digit run, digits only.
    Phone,
    /// Well-formed e-mail address.
    Email,
    /// Remainder of the line, or the next unlabeled line.
    PaymentTerms,
    /// Boolean flag: anything written after the label.
    Presence,
}

struct LabelRule {
    key: &'static str,
    pattern: &'static Regex,
    post: Post,
    kind: MatchKind,
    /// Keep scanning after a hit (for rules whose key depends on the value).
    repeat: bool,
}

struct CombinedRule {
    pattern: &'static Regex,
    first: (&'static str, Post),
    second: (&'static str, Post),
}

const fn rule(key: &'static str, pattern: &'static Regex, post: Post, kind: MatchKind) -> LabelRule {
    LabelRule {
        key,
        pattern,
        post,
        kind,
        repeat: false,
    }
}

lazy_static! {
    static ref COMBINED_RULES: Vec<CombinedRule> = vec![
        CombinedRule {
            pattern: &NAME_AND_CUSTOMER_CODE,
            first: ("name", Post::Text),
            second: ("customer_code", Post::FirstToken),
        },
        CombinedRule {
            pattern: &PLACE_AND_DATE,
            first: ("place", Post::Text),
            second: ("order_date", Post::Date),
        },
        CombinedRule {
            pattern: &CITY_AND_STATE,
            first: ("city", Post::Text),
            second: ("state", Post::State),
        },
    ];

    static ref SINGLE_RULES: Vec<LabelRule> = vec![
        rule("name", &NAME_LABEL, Post::CutAt(&CUSTOMER_CODE_TAIL), MatchKind::Labeled),
        rule("customer_code", &CUSTOMER_CODE_LABEL, Post::FirstToken, MatchKind::Labeled),
        rule("supplier", &SUPPLIER_LABEL, Post::Text, MatchKind::Labeled),
        rule("salesperson", &SALESPERSON_LABEL, Post::Text, MatchKind::Labeled),
        rule("order_number", &ORDER_NUMBER_LABEL, Post::FirstToken, MatchKind::Labeled),
        rule("order_date", &ORDER_DATE_LABEL, Post::Date, MatchKind::LabeledDate),
        rule("delivery_date", &DELIVERY_DATE_LABEL, Post::Date, MatchKind::LabeledDate),
        rule("place", &PLACE_LABEL, Post::CutAt(&TRAILING_DATE_LABEL), MatchKind::Labeled),
        rule("address", &ADDRESS_LABEL, Post::CutAt(&TRAILING_LOCALITY_LABEL), MatchKind::Labeled),
        rule("district", &DISTRICT_LABEL, Post::CutAt(&TRAILING_LOCALITY_LABEL), MatchKind::Labeled),
        rule("city", &CITY_LABEL, Post::CutAt(&TRAILING_STATE_LABEL), MatchKind::Labeled),
        rule("state", &STATE_LABEL, Post::State, MatchKind::Labeled),
        rule("cep", &CEP_LABEL, Post::Cep, MatchKind::Labeled),
        LabelRule {
            repeat: true,
            ..rule("cpf_cnpj", &TAX_ID_LABEL, Post::TaxId, MatchKind::TaxIdLength)
        },
        rule("state_registration", &STATE_REGISTRATION_LABEL, Post::FirstToken, MatchKind::Labeled),
        rule("phone", &PHONE_LABEL, Post::Phone, MatchKind::LabeledPhone),
        rule("email", &EMAIL_LABEL, Post::Email, MatchKind::Labeled),
        rule("payment_terms", &PAYMENT_TERMS_LABEL, Post::PaymentTerms, MatchKind::Labeled),
        rule("signature_present", &SIGNATURE_LABEL, Post::Presence, MatchKind::Presence),
    ];
}

/// A captured group: a byte range of a line's normalized form.
#[derive(Clone)]
struct Capture<'a> {
    line: &'a NormalizedLine,
    range: Range<usize>,
}

impl<'a> Capture<'a> {
    fn group(line: &'a NormalizedLine, caps: &Captures<'_>, i: usize) -> Option<Self> {
        caps.get(i).map(|m| Self {
            line,
            range: m.range(),
        })
    }

    fn original(&self) -> &'a str {
        self.line.original(self.range.clone())
    }

    /// Shorten the capture to end before the first match of `pattern`.
    fn cut_at(mut self, pattern: &Regex) -> Self {
        let normalized = &self.line.normalized[self.range.clone()];
        if let Some(m) = pattern.find(normalized) {
            self.range.end = self.range.start + m.start();
        }
        self
    }
}

/// Run every rule over the lines and collect one value per key.
pub fn extract_labels(lines: &[NormalizedLine], options: LabelOptions) -> Vec<LabelOutcome> {
    let mut filled: HashSet<&'static str> = HashSet::new();
    let mut outcomes = Vec::new();

    for rule in COMBINED_RULES.iter() {
        if filled.contains(rule.first.0) || filled.contains(rule.second.0) {
            continue;
        }
        for line in lines {
            let Some(caps) = rule.pattern.captures(&line.normalized) else {
                continue;
            };
            let first = Capture::group(line, &caps, 1).and_then(|c| {
                apply(rule.first.1, rule.first.0, MatchKind::Combined, c, lines, options)
            });
            let second = Capture::group(line, &caps, 2).and_then(|c| {
                apply(rule.second.1, rule.second.0, MatchKind::Combined, c, lines, options)
            });
            if let (Some(first), Some(second)) = (first, second) {
                debug!(
                    "Combined match on line {}: {}={} {}={}",
                    line.index, first.key, first.value, second.key, second.value
                );
                filled.insert(first.key);
                filled.insert(second.key);
                outcomes.push(first);
                outcomes.push(second);
                break;
            }
        }
    }

    for rule in SINGLE_RULES.iter() {
        if !rule.repeat && filled.contains(rule.key) {
            continue;
        }
        for line in lines {
            let Some(caps) = rule.pattern.captures(&line.normalized) else {
                continue;
            };
            let Some(outcome) = Capture::group(line, &caps, 1)
                .and_then(|c| apply(rule.post, rule.key, rule.kind, c, lines, options))
            else {
                continue;
            };
            if filled.insert(outcome.key) {
                debug!("Label match on line {}: {}={}", line.index, outcome.key, outcome.value);
                outcomes.push(outcome);
            }
            if !rule.repeat {
                break;
            }
        }
    }

    outcomes
}

fn apply(
    post: Post,
    key: &'static str,
    kind: MatchKind,
    capture: Capture<'_>,
    lines: &[NormalizedLine],
    options: LabelOptions,
) -> Option<LabelOutcome> {
    let line = capture.line.index;
    let outcome = |key: &'static str, value: FieldValue, kind: MatchKind| LabelOutcome {
        key,
        value,
        kind,
        line,
    };

    match post {
        Post::Text => text_value(capture.original()).map(|v| outcome(key, v, kind)),
        Post::FirstToken => capture
            .original()
            .split_whitespace()
            .next()
            .and_then(text_value)
            .map(|v| outcome(key, v, kind)),
        Post::CutAt(pattern) => {
            text_value(capture.cut_at(pattern).original()).map(|v| outcome(key, v, kind))
        }
        Post::Date => find_date(capture.original()).map(|d| outcome(key, FieldValue::Text(d), kind)),
        Post::State => {
            let state = capture.original().to_uppercase();
            (state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic()))
                .then(|| outcome(key, FieldValue::Text(state), kind))
        }
        Post::Cep => {
            let digits = digits_only(capture.original());
            (digits.len() == 8).then(|| {
                let cep = format!("{}-{}", &digits[..5], &digits[5..]);
                outcome(key, FieldValue::Text(cep), kind)
            })
        }
        Post::TaxId => {
            let (tax_kind, digits) = classify_tax_id(capture.original())?;
            let kind = if options.validate_tax_id_checksum {
                if !validate(tax_kind, &digits) {
                    debug!("Dropping {} with bad check digits", tax_kind.key());
                    return None;
                }
                MatchKind::TaxIdChecksum
            } else {
                kind
            };
            Some(outcome(tax_kind.key(), FieldValue::Text(digits), kind))
        }
        Post::Phone => {
            let phone = PHONE_SHAPE.find(capture.original())?;
            let digits = digits_only(phone.as_str());
            matches!(digits.len(), 10 | 11).then(|| outcome(key, FieldValue::Text(digits), kind))
        }
        Post::Email => EMAIL
            .find(capture.original())
            .map(|m| outcome(key, FieldValue::Text(m.as_str().to_lowercase()), kind)),
        Post::PaymentTerms => {
            if let Some(v) = text_value(capture.original()) {
                return Some(outcome(key, v, kind));
            }
            let next = lines.get(line + 1)?;
            if LABELED_LINE.is_match(&next.normalized) {
                return None;
            }
            text_value(&next.text).map(|v| outcome(key, v, kind))
        }
        // A blank signature line is absence, not a stored `false`.
        Post::Presence => capture
            .original()
            .chars()
            .any(char::is_alphanumeric)
            .then(|| outcome(key, FieldValue::Structured(true.into()), kind)),
    }
}

/// Collapse whitespace; values with no letters or digits (blank form lines
/// such as `______`) are treated as absent.
fn text_value(s: &str) -> Option<FieldValue> {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .any(char::is_alphanumeric)
        .then_some(FieldValue::Text(collapsed))
}

fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}
