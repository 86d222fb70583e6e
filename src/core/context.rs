//! Everything a session works with
//!
//! `AtmContext` owns the machine's components and hands them out by
//! reference. There are no globals: the state machine, the operator loops,
//! and the top loop all receive the context explicitly.

use crate::core::account_store::AccountStore;
use crate::core::authenticator::Authenticator;
use crate::core::card_reader::{CardReader, CardRetainer};
use crate::core::cash_inventory::CashInventory;
use crate::core::power::PowerController;
use crate::core::session::Session;
use crate::core::timer::Prompter;
use crate::core::traits::{ReceiptJournal, SoundPlayer, Terminal};
use crate::core::transaction::{Transaction, TransactionContext};
use crate::types::{AtmConfig, AtmError, CardNumber, Receipt};
use std::sync::Arc;
use tracing::{error, warn};

/// Devices the machine talks to
pub struct Devices {
    pub terminal: Box<dyn Terminal>,
    pub sound: Box<dyn SoundPlayer>,
    pub journal: Box<dyn ReceiptJournal>,
}

pub struct AtmContext {
    pub config: AtmConfig,
    pub accounts: Arc<AccountStore>,
    pub inventory: CashInventory,
    pub authenticator: Authenticator,
    pub reader: CardReader,
    pub retainer: CardRetainer,
    pub session: Session,
    pub prompter: Prompter,
    pub power: PowerController,
    pub sound: Box<dyn SoundPlayer>,
    pub journal: Box<dyn ReceiptJournal>,
}

impl AtmContext {
    /// Assemble a machine around an opened account store and inventory
    ///
    /// The retention bin is rebuilt from the accounts flagged as retained,
    /// so cards swallowed before a restart are still there to collect.
    pub fn new(
        config: AtmConfig,
        accounts: Arc<AccountStore>,
        inventory: CashInventory,
        devices: Devices,
    ) -> Self {
        let authenticator =
            Authenticator::new(accounts.clone(), config.max_pin_attempts, config.pin_length);
        let retainer = CardRetainer::from_card_numbers(accounts.retained_card_numbers());
        let prompter = Prompter::new(devices.terminal, config.session_timeout);

        AtmContext {
            config,
            accounts,
            inventory,
            authenticator,
            reader: CardReader::new(),
            retainer,
            session: Session::new(),
            prompter,
            power: PowerController::new(),
            sound: devices.sound,
            journal: devices.journal,
        }
    }

    /// Run a client transaction and report the outcome
    ///
    /// Refusals are shown to the client and journalled as failed receipts.
    /// Fatal errors are journalled and returned.
    pub fn run_transaction(
        &mut self,
        card: &CardNumber,
        transaction: &dyn Transaction,
    ) -> Result<(), AtmError> {
        let kind = transaction.kind();
        let result = {
            let mut ctx = TransactionContext {
                card,
                accounts: &self.accounts,
                inventory: &mut self.inventory,
                config: &self.config,
            };
            transaction.execute(&mut ctx)
        };

        match result {
            Ok(receipt) => {
                self.sound.beep_success();
                let text = receipt.render(&self.config.currency);
                self.prompter.message(&text);
                self.journal_receipt(&receipt);
                Ok(())
            }
            Err(e) if !e.is_fatal() => {
                warn!(card = %card.masked(), %kind, error = %e, "Transaction refused");
                self.sound.beep_error();
                self.prompter.message(&format!("Error: {}", e));
                self.journal_receipt(&Receipt::failed(card, kind, e.to_string()));
                Ok(())
            }
            Err(e) => {
                self.sound.beep_error();
                self.journal_receipt(&Receipt::failed(card, kind, e.to_string()));
                Err(e)
            }
        }
    }

    fn journal_receipt(&mut self, receipt: &Receipt) {
        if let Err(e) = self.journal.record(receipt) {
            error!(error = %e, kind = %receipt.kind, "Failed to journal receipt");
        }
    }

    /// Release the card and the session after a failure
    pub fn abort_session(&mut self) {
        if let Some(card) = self.reader.eject() {
            warn!(card = %card.number.masked(), "Card ejected after failure");
        }
        self.session.end();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::io::{
        demo_accounts, LogSoundPlayer, MemoryReceiptJournal, MemoryRepository, ScriptStep,
        ScriptedTerminal, Transcript,
    };
    use crate::types::{Denomination, Notes};
    use std::time::Duration;

    /// Machine wired to in-memory collaborators
    pub(crate) struct TestMachine {
        pub ctx: AtmContext,
        pub transcript: Transcript,
        pub journal: MemoryReceiptJournal,
        pub accounts_repo: Arc<MemoryRepository>,
        pub inventory_repo: Arc<MemoryRepository>,
    }

    /// Demo accounts, empty cassettes except `cassettes`, scripted input
    pub(crate) fn machine(steps: Vec<ScriptStep>, cassettes: &[(Denomination, u32)]) -> TestMachine {
        let config = AtmConfig {
            session_timeout: Duration::from_millis(50),
            ..AtmConfig::default()
        };
        let accounts_repo = Arc::new(MemoryRepository::with_accounts(demo_accounts().unwrap()));
        let mut counts: Notes = config.denominations.iter().map(|d| (*d, 0)).collect();
        counts.extend(cassettes.iter().copied());
        let inventory_repo = Arc::new(MemoryRepository::new().with_inventory(counts));

        let accounts = Arc::new(AccountStore::open(accounts_repo.clone()).unwrap());
        let inventory = CashInventory::open(
            inventory_repo.clone(),
            &config.denominations,
            config.initial_notes_per_cassette,
            config.withdrawal_unit,
        )
        .unwrap();

        let terminal = ScriptedTerminal::from_steps(steps);
        let transcript = terminal.transcript();
        let journal = MemoryReceiptJournal::new();
        let devices = Devices {
            terminal: Box::new(terminal),
            sound: Box::new(LogSoundPlayer),
            journal: Box::new(journal.clone()),
        };

        TestMachine {
            ctx: AtmContext::new(config, accounts, inventory, devices),
            transcript,
            journal,
            accounts_repo,
            inventory_repo,
        }
    }

    /// Scripted lines
    pub(crate) fn lines(lines: &[&str]) -> Vec<ScriptStep> {
        lines.iter().map(|line| ScriptStep::line(*line)).collect()
    }
}
