//! Account-related types for the ATM engine
//!
//! This module defines the bank account record linked to a card, the opaque
//! PIN hash, and the role a card plays at the machine.

use super::card::CardNumber;
use super::error::AtmError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// What a card is allowed to do at the machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Ordinary cardholder
    #[default]
    Client,
    /// Cash-in-transit staff (incassator)
    CashReplenisher,
    /// Service technician
    Technician,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountRole::Client => "client",
            AccountRole::CashReplenisher => "cash replenisher",
            AccountRole::Technician => "technician",
        };
        f.write_str(name)
    }
}

/// Opaque PIN hash
///
/// The value is derived from the card number and the PIN and only ever
/// compared for equality. It is a placeholder digest, not a PIN KDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinHash(String);

impl PinHash {
    /// Derive the hash stored for `pin` on `card`
    pub fn derive(card: &CardNumber, pin: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(card.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(pin.as_bytes());
        PinHash(format!("{:x}", hasher.finalize()))
    }

    /// Check `pin` against this hash
    pub fn matches(&self, card: &CardNumber, pin: &str) -> bool {
        *self == PinHash::derive(card, pin)
    }
}

/// Bank account linked to a card
///
/// Accounts are replaced wholesale on every change: the store swaps in a new
/// value built with one of the `with_*` methods.
///
/// # Invariants
///
/// - `balance` is never negative
/// - `card_number` never changes after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Card number, also the account key
    pub card_number: CardNumber,

    /// Hashed PIN
    pub pin_hash: PinHash,

    /// Current balance
    pub balance: Decimal,

    /// Card is blocked (too many wrong PINs or bank decision)
    #[serde(default)]
    pub is_blocked: bool,

    /// Card is physically held by the machine
    #[serde(default)]
    pub is_retained: bool,

    /// Optional cardholder name
    #[serde(default)]
    pub owner_name: Option<String>,

    /// Optional expiry date, e.g. `12/28`
    #[serde(default)]
    pub expiry_date: Option<String>,

    /// Role of the card
    #[serde(default)]
    pub role: AccountRole,
}

impl Account {
    /// Create an unblocked client account
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::InvalidAmount`] if `balance` is negative.
    pub fn new(card_number: CardNumber, pin: &str, balance: Decimal) -> Result<Self, AtmError> {
        if balance < Decimal::ZERO {
            return Err(AtmError::invalid_amount(balance, "balance cannot be negative"));
        }
        let pin_hash = PinHash::derive(&card_number, pin);
        Ok(Account {
            card_number,
            pin_hash,
            balance,
            is_blocked: false,
            is_retained: false,
            owner_name: None,
            expiry_date: None,
            role: AccountRole::Client,
        })
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner_name = Some(owner.into());
        self
    }

    pub fn with_expiry(mut self, expiry: impl Into<String>) -> Self {
        self.expiry_date = Some(expiry.into());
        self
    }

    pub fn with_role(mut self, role: AccountRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.is_blocked = blocked;
        self
    }

    pub fn with_retained(mut self, retained: bool) -> Self {
        self.is_retained = retained;
        self
    }

    /// Copy of this account with a new balance
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::Internal`] for a negative balance; callers check
    /// funds before building the new snapshot.
    pub fn with_balance(&self, balance: Decimal) -> Result<Self, AtmError> {
        if balance < Decimal::ZERO {
            return Err(AtmError::internal(format!(
                "negative balance {} for card {}",
                balance,
                self.card_number.masked()
            )));
        }
        Ok(Account {
            balance,
            ..self.clone()
        })
    }

    pub fn with_pin(&self, pin: &str) -> Self {
        Account {
            pin_hash: PinHash::derive(&self.card_number, pin),
            ..self.clone()
        }
    }

    /// Check `pin` against the stored hash
    pub fn verify_pin(&self, pin: &str) -> bool {
        self.pin_hash.matches(&self.card_number, pin)
    }
}
