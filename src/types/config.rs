//! Machine configuration
//!
//! All limits and file locations the core consults live in [`AtmConfig`].
//! Components receive the values they need at construction time.

use super::cash::Denomination;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Configuration for one ATM
#[derive(Clone, Debug, PartialEq)]
pub struct AtmConfig {
    /// Directory holding the JSON documents and the receipt journal
    pub data_dir: PathBuf,
    /// Inactivity threshold for every timed prompt
    pub session_timeout: Duration,
    /// Wrong PINs allowed before a card is blocked
    pub max_pin_attempts: u32,
    /// Digits in a PIN
    pub pin_length: usize,
    /// Smallest withdrawal accepted
    pub min_withdrawal: u64,
    /// Largest single withdrawal accepted
    pub max_withdrawal: u64,
    /// Withdrawals must be a multiple of this
    pub withdrawal_unit: u64,
    /// Cassette denominations, any order
    pub denominations: Vec<Denomination>,
    /// Notes per cassette when no saved state exists
    pub initial_notes_per_cassette: u32,
    /// Currency code shown to users
    pub currency: String,
    /// Seed demo accounts when the accounts file is missing or empty
    pub seed_demo_accounts: bool,
}

impl Default for AtmConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            session_timeout: Duration::from_secs(60),
            max_pin_attempts: 3,
            pin_length: 4,
            min_withdrawal: 100,
            max_withdrawal: 50_000,
            withdrawal_unit: 100,
            denominations: vec![20, 50, 100, 200, 500, 1000],
            initial_notes_per_cassette: 50,
            currency: "BYN".to_string(),
            seed_demo_accounts: true,
        }
    }
}

impl AtmConfig {
    /// Create a configuration with custom runtime limits
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(data_dir: PathBuf, session_timeout: Duration, max_pin_attempts: u32) -> Self {
        let default = Self::default();

        let session_timeout = if session_timeout.is_zero() {
            warn!(
                "Invalid session timeout ({:?}), using default ({:?})",
                session_timeout, default.session_timeout
            );
            default.session_timeout
        } else {
            session_timeout
        };

        let max_pin_attempts = if max_pin_attempts == 0 {
            warn!(
                "Invalid max PIN attempts ({}), using default ({})",
                max_pin_attempts, default.max_pin_attempts
            );
            default.max_pin_attempts
        } else {
            max_pin_attempts
        };

        Self {
            data_dir,
            session_timeout,
            max_pin_attempts,
            ..default
        }
    }

    pub fn accounts_file(&self) -> PathBuf {
        self.data_dir.join("bank_accounts.json")
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir.join("atm_state.json")
    }

    pub fn journal_file(&self) -> PathBuf {
        self.data_dir.join("receipts.csv")
    }
}
