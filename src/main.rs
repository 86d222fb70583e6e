//! Rust ATM Engine CLI
//!
//! Interactive console ATM with client, cash-replenisher, and technician
//! sessions.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- --data-dir ./data --timeout-secs 30
//! cargo run -- --max-pin-attempts 5 --log-file atm.log --verbose
//! cargo run -- --no-seed
//! ```
//!
//! Accounts and cassette counts are read from and written to JSON files in
//! the data directory. Receipts are appended to `receipts.csv` there.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unreadable data files, log file not writable, etc.)

use rust_atm_engine::cli;
use rust_atm_engine::core::{AccountStore, Atm, AtmContext, CashInventory, Devices};
use rust_atm_engine::io::{
    demo_accounts, ConsoleTerminal, CsvReceiptJournal, JsonFileRepository, LogSoundPlayer,
};
use rust_atm_engine::AtmError;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let args = cli::parse_args();

    if let Err(e) = cli::init_logging(args.verbose, args.log_file.as_deref()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&args) {
        error!(error = %e, "ATM failed to start");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &cli::CliArgs) -> Result<(), AtmError> {
    let config = args.to_config();
    let repository = Arc::new(JsonFileRepository::new(
        config.accounts_file(),
        config.state_file(),
    ));

    let accounts = Arc::new(AccountStore::open(repository.clone())?);
    if config.seed_demo_accounts && accounts.seed_if_empty(demo_accounts()?)? {
        info!(path = %config.accounts_file().display(), "Demo accounts created");
    }

    let inventory = CashInventory::open(
        repository,
        &config.denominations,
        config.initial_notes_per_cassette,
        config.withdrawal_unit,
    )?;

    let devices = Devices {
        terminal: Box::new(ConsoleTerminal::new()?),
        sound: Box::new(LogSoundPlayer),
        journal: Box::new(CsvReceiptJournal::open(config.journal_file())?),
    };

    let mut atm = Atm::new(AtmContext::new(config, accounts, inventory, devices));
    atm.run();
    Ok(())
}
