//! I/O module
//!
//! Implementations of the collaborator traits in [`crate::core::traits`].
//!
//! # Components
//!
//! - `json_store` - Accounts and machine state as JSON documents
//! - `memory` - In-memory repository for ephemeral runs and tests
//! - `console` - Stdin/stdout terminal with timed reads
//! - `scripted` - Terminal replaying scripted input
//! - `receipt_journal` - CSV and in-memory receipt journals
//! - `sound` - Log-only sound player
//! - `seed` - Demo accounts

pub mod console;
pub mod json_store;
pub mod memory;
pub mod receipt_journal;
pub mod scripted;
pub mod seed;
pub mod sound;

pub use console::ConsoleTerminal;
pub use json_store::JsonFileRepository;
pub use memory::MemoryRepository;
pub use receipt_journal::{CsvReceiptJournal, MemoryReceiptJournal};
pub use scripted::{ScriptStep, ScriptedTerminal, Transcript};
pub use seed::demo_accounts;
pub use sound::LogSoundPlayer;
