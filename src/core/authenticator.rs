//! PIN authentication and lockout
//!
//! The `Authenticator` owns the only wrong-PIN counter in the system. Each
//! card gets a counter the first time a well-formed PIN is checked for it;
//! a correct PIN resets the counter to the maximum, a wrong one decrements
//! it, and reaching zero blocks the card in the account store.
//!
//! Checks that fail before the PIN is compared (blocked card, unknown card,
//! malformed PIN) never touch the counter.

use crate::core::account_store::AccountStore;
use crate::types::{AtmError, CardNumber};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// PIN matched
    Granted,
    /// PIN did not match; the card still has attempts left
    Rejected { attempts_left: u32 },
    /// PIN did not match and this failure blocked the card
    Locked,
    /// Card was already blocked
    CardBlocked,
    /// Card is not known
    UnknownCard,
    /// PIN is not the configured number of digits
    InvalidFormat,
}

/// Stateful per-card PIN checker
pub struct Authenticator {
    accounts: Arc<AccountStore>,
    max_attempts: u32,
    pin_length: usize,
    /// Remaining attempts per card
    attempts_left: HashMap<CardNumber, u32>,
}

impl Authenticator {
    pub fn new(accounts: Arc<AccountStore>, max_attempts: u32, pin_length: usize) -> Self {
        Authenticator {
            accounts,
            max_attempts,
            pin_length,
            attempts_left: HashMap::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn pin_length(&self) -> usize {
        self.pin_length
    }

    /// Whether `pin` is exactly `pin_length` ASCII digits
    pub fn is_valid_pin_format(&self, pin: &str) -> bool {
        pin.len() == self.pin_length && pin.chars().all(|c| c.is_ascii_digit())
    }

    /// Remaining attempts tracked for a card, if a counter exists
    pub fn attempts_left(&self, card: &CardNumber) -> Option<u32> {
        self.attempts_left.get(card).copied()
    }

    /// Remaining attempts, treating an untracked card as fresh
    pub fn remaining_attempts(&self, card: &CardNumber) -> u32 {
        self.attempts_left(card).unwrap_or(self.max_attempts)
    }

    /// Check a PIN for a card
    ///
    /// # Steps
    ///
    /// 1. Blocked or unknown card: fail without touching the counter.
    /// 2. Malformed PIN: fail without touching the counter.
    /// 3. Create the card's counter at the maximum if absent.
    /// 4. Correct PIN: reset the counter and grant.
    /// 5. Wrong PIN: decrement; at zero block the card and drop the counter.
    ///
    /// # Errors
    ///
    /// Returns a storage error if blocking the card cannot be persisted. The
    /// counter is left at zero in that case so the next failure retries the
    /// block.
    pub fn authenticate(&mut self, card: &CardNumber, pin: &str) -> Result<AuthOutcome, AtmError> {
        let Some(account) = self.accounts.get_account(card) else {
            warn!(card = %card.masked(), "Authentication for unknown card");
            return Ok(AuthOutcome::UnknownCard);
        };
        if account.is_blocked {
            warn!(card = %card.masked(), "Authentication for blocked card");
            return Ok(AuthOutcome::CardBlocked);
        }
        if !self.is_valid_pin_format(pin) {
            return Ok(AuthOutcome::InvalidFormat);
        }

        let max_attempts = self.max_attempts;
        let remaining = self
            .attempts_left
            .entry(card.clone())
            .or_insert(max_attempts);

        if self.accounts.validate_pin(card, pin) {
            *remaining = max_attempts;
            info!(card = %card.masked(), "PIN accepted");
            return Ok(AuthOutcome::Granted);
        }

        *remaining = remaining.saturating_sub(1);
        let attempts_left = *remaining;
        warn!(card = %card.masked(), attempts_left, "Wrong PIN");

        if attempts_left > 0 {
            return Ok(AuthOutcome::Rejected { attempts_left });
        }

        self.accounts.block_card(card)?;
        self.attempts_left.remove(card);
        Ok(AuthOutcome::Locked)
    }
}
