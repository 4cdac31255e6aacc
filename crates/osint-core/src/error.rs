//! # Validation Errors
//!
//! Rejection reasons for candidate identity numbers, built with `thiserror`.
//!
//! The variants follow the order in which the validator evaluates its
//! guards. A candidate is reported against the first guard it fails.

use thiserror::Error;

/// Why a candidate string is not a valid Ecuadorian natural-person cédula.
///
/// Carries enough context for the console to phrase a useful message while
/// never exposing more than the offending position or value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CedulaRejection {
    /// The trimmed input is not exactly 10 characters long.
    #[error("identity number must be exactly 10 digits, got {len} characters")]
    Length {
        /// Length of the trimmed input, in characters.
        len: usize,
    },

    /// A character is not an ASCII decimal digit.
    #[error("identity number must contain only digits: {found:?} at position {position}")]
    NonDigit {
        /// Zero-based character position of the first offending character.
        position: usize,
        /// The offending character.
        found: char,
    },

    /// The two-digit prefix is not a province code (01-24 or 30).
    #[error("invalid province code {code:02} (expected 01-24 or 30)")]
    Province {
        /// The prefix read as an integer.
        code: u8,
    },

    /// The third digit marks a registration class other than natural persons.
    #[error("third digit {digit} is not a natural-person class (expected 0-5)")]
    PersonClass {
        /// The third digit.
        digit: u8,
    },

    /// The weighted modulo-10 checksum does not match the tenth digit.
    #[error("check digit mismatch: expected {expected}, found {found}")]
    CheckDigit {
        /// Check digit computed from the first nine digits.
        expected: u8,
        /// Tenth digit as entered.
        found: u8,
    },
}

impl CedulaRejection {
    /// True when the input was not ten numeric characters at all, as opposed
    /// to ten digits that fail the structural or arithmetic checks.
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::Length { .. } | Self::NonDigit { .. })
    }
}
