//! # Cédula Validation
//!
//! Validator for Ecuadorian natural-person identity numbers (*cédulas*) and
//! the [`Cedula`] newtype that carries a validated number through the rest
//! of the workspace.
//!
//! ## Algorithm
//!
//! After trimming surrounding whitespace, a candidate must pass four guards
//! in order:
//!
//! 1. exactly 10 ASCII decimal digits;
//! 2. the two-digit prefix is a province code, 01-24 or 30;
//! 3. the third digit is below 6 (natural persons);
//! 4. the tenth digit equals the weighted modulo-10 check digit of the first
//!    nine, using coefficients `2,1,2,1,2,1,2,1,2` and folding two-digit
//!    products by subtracting 9.
//!
//! Every function here is pure and total: no input string can make them
//! panic or allocate shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CedulaRejection;
use crate::province::Province;

/// Number of digits in a cédula.
pub const CEDULA_LEN: usize = 10;

/// Positional multipliers applied to the first nine digits.
const COEFFICIENTS: [u8; 9] = [2, 1, 2, 1, 2, 1, 2, 1, 2];

/// Third digits at or above this value belong to non-natural-person classes.
const PERSON_CLASS_LIMIT: u8 = 6;

/// Compute the check digit for the first nine digits of a cédula.
///
/// Each digit is multiplied by its coefficient; products of 10 or more have
/// 9 subtracted. The check digit is `(10 - total % 10) % 10`.
///
/// Digits are expected in `0..=9`; larger values are not rejected but
/// produce a meaningless result.
pub fn expected_check_digit(first_nine: &[u8; 9]) -> u8 {
    let total: u32 = first_nine
        .iter()
        .zip(COEFFICIENTS)
        .map(|(&digit, coef)| {
            let product = u32::from(digit) * u32::from(coef);
            if product >= 10 {
                product - 9
            } else {
                product
            }
        })
        .sum();
    ((10 - total % 10) % 10) as u8
}

/// Check a candidate identity number and report the first failed guard.
///
/// Returns `Ok(())` for a valid natural-person cédula. Whitespace is
/// trimmed at both ends only; an internal space fails the digit guard.
///
/// # Errors
///
/// Returns the [`CedulaRejection`] for the first guard the candidate fails.
pub fn check_cedula(candidate: &str) -> Result<(), CedulaRejection> {
    parse_digits(candidate).map(|_| ())
}

/// Decide whether `candidate` is a valid Ecuadorian natural-person cédula.
///
/// Never panics, whatever the input. Equivalent to
/// `check_cedula(candidate).is_ok()`.
pub fn is_valid_cedula(candidate: &str) -> bool {
    check_cedula(candidate).is_ok()
}

/// Run every guard and return the parsed digits on success.
fn parse_digits(candidate: &str) -> Result<[u8; CEDULA_LEN], CedulaRejection> {
    let trimmed = candidate.trim();

    let len = trimmed.chars().count();
    if len != CEDULA_LEN {
        return Err(CedulaRejection::Length { len });
    }

    let mut digits = [0u8; CEDULA_LEN];
    for (position, c) in trimmed.chars().enumerate() {
        if !c.is_ascii_digit() {
            return Err(CedulaRejection::NonDigit { position, found: c });
        }
        digits[position] = c as u8 - b'0';
    }

    let code = digits[0] * 10 + digits[1];
    if Province::from_code(code).is_none() {
        return Err(CedulaRejection::Province { code });
    }

    if digits[2] >= PERSON_CLASS_LIMIT {
        return Err(CedulaRejection::PersonClass { digit: digits[2] });
    }

    let mut first_nine = [0u8; 9];
    first_nine.copy_from_slice(&digits[..9]);
    let expected = expected_check_digit(&first_nine);
    if expected != digits[9] {
        return Err(CedulaRejection::CheckDigit {
            expected,
            found: digits[9],
        });
    }

    Ok(digits)
}

/// A validated Ecuadorian natural-person identity number.
///
/// Only the trimmed 10-digit form is stored; the input as typed is not kept,
/// so values from padded and bare input compare equal and every consumer
/// sends the same digits to the portals. Construction goes through
/// [`Cedula::new`] (or `FromStr` / `Deserialize`, which route through it),
/// so every value of this type satisfies all four validator guards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Cedula(String);

impl<'de> Deserialize<'de> for Cedula {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

impl Cedula {
    /// Validate `value` and wrap its trimmed form.
    ///
    /// # Errors
    ///
    /// Returns the [`CedulaRejection`] for the first guard that fails.
    pub fn new(value: impl AsRef<str>) -> Result<Self, CedulaRejection> {
        let value = value.as_ref();
        parse_digits(value)?;
        Ok(Self(value.trim().to_string()))
    }

    /// The 10-digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ten digits as numbers.
    pub fn digits(&self) -> [u8; CEDULA_LEN] {
        let mut out = [0u8; CEDULA_LEN];
        for (slot, b) in out.iter_mut().zip(self.0.bytes()) {
            *slot = b - b'0';
        }
        out
    }

    /// The two-digit province code (1-24 or 30).
    pub fn province_code(&self) -> u8 {
        let d = self.digits();
        d[0] * 10 + d[1]
    }

    /// The province of issuance.
    pub fn province(&self) -> Province {
        // Guard 2 guarantees the code maps to a province.
        Province::from_code(self.province_code()).unwrap_or(Province::Exterior)
    }

    /// The tenth (check) digit.
    pub fn check_digit(&self) -> u8 {
        self.digits()[9]
    }
}

impl fmt::Display for Cedula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cedula {
    type Err = CedulaRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Cedula {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
