//! Core business logic module
//!
//! This module contains the session core of the machine:
//! - `traits` - Seams to the terminal, sound, persistence, and receipt journal
//! - `account_store` - Account records and balance operations
//! - `authenticator` - PIN checks and the wrong-PIN lockout
//! - `cash_inventory` - Cassette counts and the dispense planner
//! - `card_reader` - Card slot and retention bin
//! - `session` - The single active session
//! - `timer` - Inactivity timer and timed prompts
//! - `transaction` - Client transaction executors
//! - `state_machine` - Client session state machine
//! - `operator` - Cash-replenisher and technician sessions
//! - `power` - Power cycling
//! - `context` - The components wired together
//! - `atm` - The top-level loop

pub mod account_store;
pub mod atm;
pub mod authenticator;
pub mod card_reader;
pub mod cash_inventory;
pub mod context;
pub mod operator;
pub mod power;
pub mod session;
pub mod state_machine;
pub mod timer;
pub mod traits;
pub mod transaction;

pub use account_store::AccountStore;
pub use atm::Atm;
pub use authenticator::{AuthOutcome, Authenticator};
pub use card_reader::{CardReader, CardRetainer};
pub use cash_inventory::CashInventory;
pub use context::{AtmContext, Devices};
pub use operator::run_operator_session;
pub use power::PowerController;
pub use session::{ActiveSession, Session};
pub use state_machine::{AtmState, AtmStateMachine, Control};
pub use timer::{InactivityTimer, Prompt, Prompter};
pub use traits::{
    AccountRepository, InventoryRepository, LineRead, ReceiptJournal, SoundPlayer, Terminal,
};
pub use transaction::{Transaction, TransactionContext};
