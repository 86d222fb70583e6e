//! Rust ATM Engine Library
//! # Overview
//!
//! This library provides the session core of a single automated teller
//! machine: card handling, PIN authentication with lockout, client
//! transactions, cash dispensing from denomination cassettes, and operator
//! sessions for cash replenishment and maintenance.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (CardNumber, Account, AtmConfig, AtmError, etc.)
//! - [`cli`] - CLI arguments parsing and logging setup
//! - [`core`] - Business logic components:
//!   - [`core::state_machine`] - Client session sequencing
//!   - [`core::authenticator`] - PIN checks and card blocking
//!   - [`core::cash_inventory`] - Cassette counts and greedy dispensing
//!   - [`core::operator`] - Replenisher and technician sessions
//!   - [`core::atm`] - The top-level loop
//! - [`io`] - Terminals, JSON persistence, and the receipt journal
//!
//! # Client Transactions
//!
//! - **Balance**: Show the current balance
//! - **Withdrawal**: Debit the account and dispense notes (refunded if the dispense fails)
//! - **Deposit**: Accept notes and credit the account
//! - **Transfer**: Move funds to another active card
//! - **Payment**: Pay a named service from the balance
//! - **PIN change**: Replace the PIN after re-entering the current one
//!
//! # Sessions
//!
//! At most one session is active. Every timed prompt is guarded by an
//! inactivity timeout; a client timeout returns the card and ends the
//! session.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod types;

pub use core::{Atm, AtmContext, AtmStateMachine, CashInventory, Devices};
pub use io::JsonFileRepository;
pub use types::{Account, AccountRole, AtmConfig, AtmError, Card, CardNumber, SessionKind};
