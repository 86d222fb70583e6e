//! In-memory repository
//!
//! Keeps accounts and cassette counts in process memory. Used for ephemeral
//! runs and by tests; `fail_saves` lets tests exercise storage failures.

use crate::core::traits::{AccountRepository, InventoryRepository};
use crate::types::{Account, AtmError, Notes};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Repository backed by process memory
#[derive(Debug, Default)]
pub struct MemoryRepository {
    accounts: Mutex<Vec<Account>>,
    inventory: Mutex<Option<Notes>>,
    fail_saves: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository preloaded with accounts
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        MemoryRepository {
            accounts: Mutex::new(accounts),
            ..Self::default()
        }
    }

    /// Repository preloaded with cassette counts
    pub fn with_inventory(self, notes: Notes) -> Self {
        MemoryRepository {
            inventory: Mutex::new(Some(notes)),
            ..self
        }
    }

    /// Make every subsequent save fail with a storage error
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Accounts as last saved
    pub fn saved_accounts(&self) -> Vec<Account> {
        self.accounts
            .lock()
            .map(|accounts| accounts.clone())
            .unwrap_or_default()
    }

    /// Cassette counts as last saved
    pub fn saved_inventory(&self) -> Option<Notes> {
        self.inventory.lock().ok().and_then(|notes| notes.clone())
    }

    fn check_writable(&self) -> Result<(), AtmError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AtmError::storage("repository is read-only"));
        }
        Ok(())
    }
}

impl AccountRepository for MemoryRepository {
    fn load_accounts(&self) -> Result<Vec<Account>, AtmError> {
        let accounts = self
            .accounts
            .lock()
            .map_err(|_| AtmError::storage("account repository lock poisoned"))?;
        Ok(accounts.clone())
    }

    fn save_accounts(&self, accounts: &[Account]) -> Result<(), AtmError> {
        self.check_writable()?;
        let mut stored = self
            .accounts
            .lock()
            .map_err(|_| AtmError::storage("account repository lock poisoned"))?;
        *stored = accounts.to_vec();
        Ok(())
    }
}

impl InventoryRepository for MemoryRepository {
    fn load_inventory(&self) -> Result<Option<Notes>, AtmError> {
        let inventory = self
            .inventory
            .lock()
            .map_err(|_| AtmError::storage("inventory repository lock poisoned"))?;
        Ok(inventory.clone())
    }

    fn save_inventory(&self, notes: &Notes) -> Result<(), AtmError> {
        self.check_writable()?;
        let mut stored = self
            .inventory
            .lock()
            .map_err(|_| AtmError::storage("inventory repository lock poisoned"))?;
        *stored = Some(notes.clone());
        Ok(())
    }
}
