//! Mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`MobileNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MobileNumberError {
    /// The input string is empty (after trimming separators).
    #[error("mobile number cannot be empty")]
    Empty,
    /// The input contains something other than digits and separators.
    #[error("mobile number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    /// Too few or too many digits.
    #[error("mobile number must have between {min} and {max} digits (got {got})")]
    InvalidLength {
        /// Minimum allowed digit count.
        min: usize,
        /// Maximum allowed digit count.
        max: usize,
        /// Digit count of the input.
        got: usize,
    },
}

/// A customer or shop mobile number.
///
/// Stored normalized: separators (spaces, dashes, parentheses) are removed and
/// a leading `+` is dropped, so the value can be used directly in WhatsApp
/// links (`wa.me/<digits>`).
///
/// ## Constraints
///
/// - 10-15 digits (E.164 allows at most 15)
/// - Only digits plus the separators listed above and one leading `+`
///
/// ## Examples
///
/// ```
/// use pharmacart_core::MobileNumber;
///
/// let number = MobileNumber::parse("+91 98765-43210").unwrap();
/// assert_eq!(number.as_str(), "919876543210");
///
/// assert!(MobileNumber::parse("").is_err());
/// assert!(MobileNumber::parse("12345").is_err());
/// assert!(MobileNumber::parse("98765abc10").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct MobileNumber(String);

impl MobileNumber {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 10;
    /// Maximum number of digits (E.164).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `MobileNumber` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains letters or other
    /// symbols, or has fewer than 10 / more than 15 digits.
    pub fn parse(s: &str) -> Result<Self, MobileNumberError> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let mut digits = String::with_capacity(body.len());
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => return Err(MobileNumberError::InvalidCharacter),
            }
        }

        if digits.is_empty() {
            return Err(MobileNumberError::Empty);
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(MobileNumberError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
                got: digits.len(),
            });
        }

        Ok(Self(digits))
    }

    /// Returns the normalized digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MobileNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MobileNumber {
    type Err = MobileNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MobileNumber {
    type Error = MobileNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MobileNumber> for String {
    fn from(number: MobileNumber) -> Self {
        number.0
    }
}
