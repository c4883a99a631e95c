//! CNPJ, the Brazilian national company registry number.
//!
//! Stores register with their CNPJ. A CNPJ has twelve base digits followed by
//! two mod-11 check digits, conventionally written as `00.000.000/0000-00`.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CNPJ_LEN: usize = 14;

/// Errors that can occur when parsing a [`Cnpj`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CnpjError {
    /// The input does not contain exactly 14 digits.
    #[error("CNPJ must have 14 digits (got {0})")]
    Length(usize),
    /// All digits are the same (e.g. `11111111111111`).
    #[error("CNPJ cannot be a repeated digit")]
    Repeated,
    /// A check digit does not match.
    #[error("CNPJ check digits do not match")]
    CheckDigit,
}

/// A validated CNPJ, stored as its 14 bare digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Parse a CNPJ, ignoring any punctuation.
    ///
    /// # Errors
    ///
    /// Returns [`CnpjError`] if the digit count is wrong, the digits are all
    /// identical, or either check digit fails.
    pub fn parse(input: &str) -> Result<Self, CnpjError> {
        let digits: Vec<u32> = input.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != CNPJ_LEN {
            return Err(CnpjError::Length(digits.len()));
        }
        if digits.iter().all(|&d| Some(&d) == digits.first()) {
            return Err(CnpjError::Repeated);
        }

        let (base, check) = digits.split_at(CNPJ_LEN - 2);
        let first = check_digit(base);
        let mut extended = base.to_vec();
        extended.push(first);
        let second = check_digit(&extended);

        if check != [first, second] {
            return Err(CnpjError::CheckDigit);
        }

        Ok(Self(digits.iter().filter_map(|&d| char::from_digit(d, 10)).collect()))
    }

    /// The 14 bare digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The conventional masked form, `00.000.000/0000-00`.
    #[must_use]
    pub fn formatted(&self) -> String {
        format_cnpj(&self.0)
    }
}

/// Mod-11 check digit over `digits`, weighting right-to-left 2..=9 cyclically.
fn check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits
        .iter()
        .rev()
        .zip((2..=9).cycle())
        .map(|(d, w)| d * w)
        .sum();
    let rem = sum % 11;
    if rem < 2 { 0 } else { 11 - rem }
}

/// Progressively mask partial CNPJ input (keeps only digits, at most 14).
///
/// Suitable for formatting as the user types:
/// `"1122"` becomes `"11.22"`, `"11222333000181"` becomes
/// `"11.222.333/0001-81"`.
#[must_use]
pub fn format_cnpj(input: &str) -> String {
    let digits: String = input
        .chars()
        .filter(char::is_ascii_digit)
        .take(CNPJ_LEN)
        .collect();

    // (position, separator inserted before that digit index)
    const SEPARATORS: [(usize, char); 4] = [(2, '.'), (5, '.'), (8, '/'), (12, '-')];

    let mut out = String::with_capacity(18);
    for (i, c) in digits.chars().enumerate() {
        if let Some((_, sep)) = SEPARATORS.iter().find(|(pos, _)| *pos == i) {
            out.push(*sep);
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Cnpj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

impl TryFrom<String> for Cnpj {
    type Error = CnpjError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cnpj> for String {
    fn from(cnpj: Cnpj) -> Self {
        cnpj.0
    }
}
