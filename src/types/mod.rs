//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account records, roles, and PIN hashes
//! - `card`: Card numbers and the reader-held card
//! - `cash`: Denominations and note bundles
//! - `config`: Machine configuration
//! - `error`: Error types for the ATM engine
//! - `receipt`: Transaction kinds and receipts
//! - `session`: Session kinds

pub mod account;
pub mod card;
pub mod cash;
pub mod config;
pub mod error;
pub mod receipt;
pub mod session;

pub use account::{Account, AccountRole, PinHash};
pub use card::{Card, CardNumber};
pub use cash::{format_notes, notes_total, parse_notes, Denomination, Notes};
pub use config::AtmConfig;
pub use error::AtmError;
pub use receipt::{Receipt, ReceiptStatus, TransactionKind};
pub use session::SessionKind;
