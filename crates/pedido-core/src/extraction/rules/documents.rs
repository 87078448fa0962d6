//! CPF / CNPJ (Brazilian tax id) classification and validation.

use serde::{Deserialize, Serialize};

/// Kind of Brazilian tax id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxIdKind {
    /// Individual taxpayer number, 11 digits.
    Cpf,
    /// Company number, 14 digits.
    Cnpj,
}

impl TaxIdKind {
    /// Field key the id is stored under.
    pub fn key(self) -> &'static str {
        match self {
            Self::Cpf => "cpf",
            Self::Cnpj => "cnpj",
        }
    }
}

/// Reduce a printed tax id to digits and classify it by length.
///
/// 11 digits is a CPF, 14 a CNPJ; any other length is discarded.
pub fn classify_tax_id(raw: &str) -> Option<(TaxIdKind, String)> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 => Some((TaxIdKind::Cpf, digits)),
        14 => Some((TaxIdKind::Cnpj, digits)),
        _ => None,
    }
}

/// Verify the check digits of a tax id of the given kind.
pub fn validate(kind: TaxIdKind, digits: &str) -> bool {
    match kind {
        TaxIdKind::Cpf => validate_cpf(digits),
        TaxIdKind::Cnpj => validate_cnpj(digits),
    }
}

/// Validate a CPF using the mod-11 check digit algorithm.
///
/// Weights run 10..2 for the first check digit and 11..2 for the second.
/// Repeated-digit ids (`111.111.111-11`) are rejected.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits = to_digits(cpf);
    if digits.len() != 11 || all_equal(&digits) {
        return false;
    }

    let check = |len: usize| -> u32 {
        let sum: u32 = digits
            .iter()
            .take(len)
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        (sum * 10 % 11) % 10
    };

    check(9) == digits[9] && check(10) == digits[10]
}

/// Validate a CNPJ using the mod-11 check digit algorithm.
pub fn validate_cnpj(cnpj: &str) -> bool {
    let digits = to_digits(cnpj);
    if digits.len() != 14 || all_equal(&digits) {
        return false;
    }

    const FIRST: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const SECOND: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
        match sum % 11 {
            r if r < 2 => 0,
            r => 11 - r,
        }
    };

    check(&FIRST) == digits[12] && check(&SECOND) == digits[13]
}

fn to_digits(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_equal(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}
