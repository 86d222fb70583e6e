//! Collaborator traits consumed by the session core
//!
//! The core never touches stdin, stdout, or the filesystem directly. These
//! traits are the seams: `io` provides console, scripted, JSON-file, CSV
//! journal, and in-memory implementations.

use crate::types::{Account, AtmError, Notes, Receipt};
use std::time::Duration;

/// Result of a single bounded wait for a line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A full line arrived (without the trailing newline)
    Line(String),
    /// Nothing arrived within the wait
    Pending,
    /// Input is closed and nothing more will arrive
    Closed,
}

/// Screen and keypad of the machine
///
/// Implementations have no notion of inactivity: `poll_line` waits at most
/// `wait` and reports what it saw. Deadline handling is done by
/// [`crate::core::Prompter`].
pub trait Terminal {
    /// Show a message to the user
    fn show_message(&mut self, text: &str);

    /// Show a numbered menu
    fn show_menu(&mut self, title: &str, options: &[&str]);

    /// Show a prompt; the answer is collected with `poll_line`
    fn show_prompt(&mut self, prompt: &str);

    /// Wait up to `wait` for one line of input
    fn poll_line(&mut self, wait: Duration) -> LineRead;
}

/// Audible feedback; fire-and-forget
pub trait SoundPlayer {
    fn beep_success(&self);
    fn beep_error(&self);
}

/// Durable storage for the account map
pub trait AccountRepository: Send + Sync {
    /// Load every stored account
    fn load_accounts(&self) -> Result<Vec<Account>, AtmError>;

    /// Replace the stored accounts with `accounts`
    fn save_accounts(&self, accounts: &[Account]) -> Result<(), AtmError>;
}

/// Durable storage for the cassette counts
pub trait InventoryRepository: Send + Sync {
    /// Load saved counts, or `None` if nothing was ever saved
    fn load_inventory(&self) -> Result<Option<Notes>, AtmError>;

    /// Persist the current counts
    fn save_inventory(&self, notes: &Notes) -> Result<(), AtmError>;
}

/// Append-only record of client transactions
pub trait ReceiptJournal {
    fn record(&mut self, receipt: &Receipt) -> Result<(), AtmError>;
}
