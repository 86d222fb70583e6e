//! Error types for the ATM engine
//!
//! This module defines every error the session core can report.
//!
//! # Error Categories
//!
//! - **Validation**: bad card format, bad PIN format, bad amounts or note lists.
//!   Reported to the user; no state transition and no side effect.
//! - **Authentication**: wrong PIN, blocked or unknown card, missing operator role.
//! - **Funds / Cash**: the account or the cassettes cannot cover a request.
//! - **Resource conflicts**: card already in the reader, session already active.
//! - **Fatal**: storage failures and internal invariant violations. These
//!   propagate to the top loop, which ends the session and returns to idle.
//!
//! Inactivity timeouts are not errors; see [`crate::core::Prompt::TimedOut`].

use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ATM engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AtmError {
    /// Card number is not sixteen digits after normalization
    #[error("Invalid card number '{input}': must be exactly 16 digits")]
    InvalidCardNumber {
        /// The raw user input
        input: String,
    },

    /// PIN is not the configured number of digits
    #[error("Invalid PIN format: must be {length} digits")]
    InvalidPinFormat {
        /// Required PIN length
        length: usize,
    },

    /// Amount rejected by a validation rule
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount {
        /// The rejected amount as entered
        amount: String,
        /// Which rule was violated
        reason: String,
    },

    /// Denomination not in the configured cassette set
    #[error("Unsupported denomination: {denomination}")]
    UnsupportedDenomination {
        /// The rejected denomination
        denomination: u32,
    },

    /// Free-form input could not be parsed
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// New PIN and its confirmation differ
    #[error("PINs do not match")]
    PinMismatch,

    /// Transfer source and destination are the same card
    #[error("Cannot transfer to the same card")]
    SelfTransfer,

    /// PIN did not match
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Card is blocked
    #[error("Card {card} is blocked")]
    CardBlocked {
        /// Masked card number
        card: String,
    },

    /// Card is not known to the account store
    #[error("Card {card} not found")]
    CardNotFound {
        /// Masked card number
        card: String,
    },

    /// Authenticated card lacks the role required for an operator session
    #[error("Access denied: card {card} is not authorized for {required}")]
    AccessDenied {
        /// Masked card number
        card: String,
        /// Role the session requires
        required: String,
    },

    /// Account balance does not cover the request
    #[error("Insufficient funds on card {card}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Masked card number
        card: String,
        /// Current balance
        available: Decimal,
        /// Requested amount
        requested: Decimal,
    },

    /// Cassettes cannot make up the exact amount
    #[error("Cannot dispense {requested} with available notes")]
    InsufficientCash {
        /// Requested amount
        requested: u64,
    },

    /// A cassette holds fewer notes than requested
    #[error("Not enough {denomination} notes in cassette: available {available}, requested {requested}")]
    InsufficientNotes {
        /// Cassette denomination
        denomination: u32,
        /// Notes in the cassette
        available: u32,
        /// Notes requested
        requested: u32,
    },

    /// Another card already occupies the reader
    #[error("Another card is already inserted")]
    CardAlreadyPresent,

    /// An operation needed a card but the reader is empty
    #[error("No card inserted")]
    NoCardInserted,

    /// A session is already running
    #[error("Session already active")]
    SessionAlreadyActive,

    /// Durable storage could not be read or written
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the failure
        message: String,
    },

    /// An internal invariant was violated
    ///
    /// This never represents a user mistake. It is surfaced to the top loop
    /// and must not be swallowed.
    #[error("Internal error: {message}")]
    Internal {
        /// Which invariant broke
        message: String,
    },
}

impl From<std::io::Error> for AtmError {
    fn from(error: std::io::Error) -> Self {
        AtmError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for AtmError {
    fn from(error: serde_json::Error) -> Self {
        AtmError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for AtmError {
    fn from(error: csv::Error) -> Self {
        AtmError::Storage {
            message: error.to_string(),
        }
    }
}

impl AtmError {
    /// Whether the error must abort the current session
    ///
    /// Fatal errors propagate to the top loop; all others are reported to the
    /// user at the state or action that produced them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AtmError::Internal { .. } | AtmError::Storage { .. })
    }

    /// Create an InvalidCardNumber error
    pub fn invalid_card_number(input: &str) -> Self {
        AtmError::InvalidCardNumber {
            input: input.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString, reason: &str) -> Self {
        AtmError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AtmError::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(card: &str, available: Decimal, requested: Decimal) -> Self {
        AtmError::InsufficientFunds {
            card: card.to_string(),
            available,
            requested,
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        AtmError::Storage {
            message: message.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        AtmError::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_card(
        AtmError::InvalidCardNumber { input: "123".to_string() },
        "Invalid card number '123': must be exactly 16 digits"
    )]
    #[case::invalid_pin(
        AtmError::InvalidPinFormat { length: 4 },
        "Invalid PIN format: must be 4 digits"
    )]
    #[case::invalid_amount(
        AtmError::invalid_amount(30, "must be a multiple of 100"),
        "Invalid amount 30: must be a multiple of 100"
    )]
    #[case::insufficient_funds(
        AtmError::insufficient_funds("****3456", Decimal::new(100, 0), Decimal::new(300, 0)),
        "Insufficient funds on card ****3456: available 100, requested 300"
    )]
    #[case::insufficient_cash(
        AtmError::InsufficientCash { requested: 700 },
        "Cannot dispense 700 with available notes"
    )]
    #[case::insufficient_notes(
        AtmError::InsufficientNotes { denomination: 100, available: 2, requested: 5 },
        "Not enough 100 notes in cassette: available 2, requested 5"
    )]
    #[case::card_present(AtmError::CardAlreadyPresent, "Another card is already inserted")]
    #[case::session_active(AtmError::SessionAlreadyActive, "Session already active")]
    #[case::internal(
        AtmError::internal("dispense remainder 50"),
        "Internal error: dispense remainder 50"
    )]
    fn test_error_display(#[case] error: AtmError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::internal(AtmError::internal("x"), true)]
    #[case::storage(AtmError::storage("disk full"), true)]
    #[case::validation(AtmError::invalid_input("x"), false)]
    #[case::auth(AtmError::AuthenticationFailed, false)]
    #[case::conflict(AtmError::CardAlreadyPresent, false)]
    #[case::cash(AtmError::InsufficientCash { requested: 100 }, false)]
    fn test_is_fatal(#[case] error: AtmError, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: AtmError = io_error.into();
        assert!(matches!(error, AtmError::Storage { .. }));
        assert_eq!(error.to_string(), "Storage error: Permission denied");
    }
}
