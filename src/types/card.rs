//! Card-related types for the ATM engine
//!
//! This module defines the validated card number and the ephemeral card
//! value that sits in the reader while a client session is running.

use super::error::AtmError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of digits in a card number
pub const CARD_NUMBER_LEN: usize = 16;

/// A validated 16-digit card number
///
/// Construction goes through [`CardNumber::parse`], which strips spaces and
/// dashes before validating, so every value of this type is exactly sixteen
/// ASCII digits. The number is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Normalize and validate user input into a card number
    ///
    /// Spaces and dashes are removed; what remains must be exactly sixteen
    /// digits.
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::InvalidCardNumber`] if the normalized input is not
    /// sixteen digits.
    pub fn parse(input: &str) -> Result<Self, AtmError> {
        let digits: String = input
            .chars()
            .filter(|c| *c != ' ' && *c != '-')
            .collect();

        if digits.len() != CARD_NUMBER_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AtmError::invalid_card_number(input));
        }

        Ok(CardNumber(digits))
    }

    /// The sixteen digits as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last four digits, for receipts and logs
    pub fn last4(&self) -> &str {
        &self.0[CARD_NUMBER_LEN - 4..]
    }

    /// Masked form used in log fields, e.g. `****3456`
    pub fn masked(&self) -> String {
        format!("****{}", self.last4())
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardNumber {
    type Error = AtmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CardNumber::parse(&value)
    }
}

impl From<CardNumber> for String {
    fn from(value: CardNumber) -> Self {
        value.0
    }
}

/// A card held by the reader
///
/// Created on insertion and destroyed on eject or retention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Card number
    pub number: CardNumber,
    /// Optional cardholder name
    pub owner: Option<String>,
    /// Optional expiry date, e.g. `12/28`
    pub expiry_date: Option<String>,
}

impl Card {
    pub fn new(number: CardNumber, owner: Option<String>, expiry_date: Option<String>) -> Self {
        Card {
            number,
            owner,
            expiry_date,
        }
    }
}
