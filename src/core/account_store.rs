//! Account store
//!
//! This module provides the `AccountStore`, the machine's view of the bank:
//! a map of card number to account that persists every change before
//! reporting success.
//!
//! # Design
//!
//! Accounts live in a `DashMap`, so operations on different cards never
//! contend and operations on the same card are serialized by the map's
//! per-entry locking. Every mutation swaps in a new `Account` value and then
//! writes the whole map through the [`AccountRepository`]. If the write fails
//! the previous value is put back and the storage error is returned, so the
//! in-memory map never runs ahead of durable state.
//!
//! Accounts are never deleted; they are only blocked or marked retained.

use crate::core::traits::AccountRepository;
use crate::types::{Account, AtmError, CardNumber};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Persisted map of card number to account
pub struct AccountStore {
    /// Accounts keyed by card number
    accounts: DashMap<CardNumber, Account>,
    /// Durable backing store
    repository: Arc<dyn AccountRepository>,
    /// Serializes snapshot writes
    persist_lock: Mutex<()>,
}

impl AccountStore {
    /// Load the store from its repository
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::Storage`] if the repository cannot be read.
    pub fn open(repository: Arc<dyn AccountRepository>) -> Result<Self, AtmError> {
        let accounts = DashMap::new();
        for account in repository.load_accounts()? {
            accounts.insert(account.card_number.clone(), account);
        }
        debug!(count = accounts.len(), "Account store loaded");

        Ok(AccountStore {
            accounts,
            repository,
            persist_lock: Mutex::new(()),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Snapshot of an account, if the card is known
    pub fn get_account(&self, card: &CardNumber) -> Option<Account> {
        self.accounts.get(card).map(|entry| entry.value().clone())
    }

    /// Whether the card exists and is blocked
    pub fn is_blocked(&self, card: &CardNumber) -> bool {
        self.accounts
            .get(card)
            .is_some_and(|account| account.is_blocked)
    }

    /// Check a PIN against the stored hash
    ///
    /// Unknown cards never validate.
    pub fn validate_pin(&self, card: &CardNumber, pin: &str) -> bool {
        self.accounts
            .get(card)
            .is_some_and(|account| account.verify_pin(pin))
    }

    /// Current balance of an active (unblocked) account
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::CardNotFound`] or [`AtmError::CardBlocked`].
    pub fn balance(&self, card: &CardNumber) -> Result<Decimal, AtmError> {
        let account = self.active_account(card)?;
        Ok(account.balance)
    }

    /// Add or replace an account
    pub fn add_account(&self, account: Account) -> Result<(), AtmError> {
        let card = account.card_number.clone();
        let previous = self.accounts.insert(card.clone(), account);
        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => self.accounts.insert(card, previous),
                None => self.accounts.remove(&card).map(|(_, account)| account),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Install `accounts` if the store holds none
    ///
    /// Returns whether anything was installed.
    pub fn seed_if_empty(&self, accounts: Vec<Account>) -> Result<bool, AtmError> {
        if !self.is_empty() || accounts.is_empty() {
            return Ok(false);
        }
        for account in accounts {
            self.accounts.insert(account.card_number.clone(), account);
        }
        if let Err(e) = self.persist() {
            self.accounts.clear();
            return Err(e);
        }
        info!(count = self.accounts.len(), "Demo accounts installed");
        Ok(true)
    }

    /// Set the balance of an active account
    ///
    /// # Errors
    ///
    /// Returns an error if the card is unknown or blocked, or if the balance
    /// is negative.
    pub fn update_balance(&self, card: &CardNumber, new_balance: Decimal) -> Result<(), AtmError> {
        self.replace(card, |account| {
            ensure_active(account)?;
            account.with_balance(new_balance)
        })?;
        Ok(())
    }

    /// Credit an active account
    ///
    /// # Arguments
    ///
    /// * `card` - The card to credit
    /// * `amount` - Positive amount to add
    ///
    /// # Returns
    ///
    /// The balance after the credit
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, the card is unknown or
    /// blocked, or the change cannot be persisted.
    pub fn deposit(&self, card: &CardNumber, amount: Decimal) -> Result<Decimal, AtmError> {
        if amount <= Decimal::ZERO {
            return Err(AtmError::invalid_amount(amount, "must be positive"));
        }
        let updated = self.replace(card, |account| {
            ensure_active(account)?;
            let new_balance = account
                .balance
                .checked_add(amount)
                .ok_or_else(|| AtmError::internal("balance overflow on deposit"))?;
            account.with_balance(new_balance)
        })?;
        Ok(updated.balance)
    }

    /// Debit an active account
    ///
    /// # Arguments
    ///
    /// * `card` - The card to debit
    /// * `amount` - Positive amount to remove
    ///
    /// # Returns
    ///
    /// The balance after the debit
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::InsufficientFunds`] if the balance does not cover
    /// the amount; the account is left unchanged.
    pub fn withdraw(&self, card: &CardNumber, amount: Decimal) -> Result<Decimal, AtmError> {
        if amount <= Decimal::ZERO {
            return Err(AtmError::invalid_amount(amount, "must be positive"));
        }
        let updated = self.replace(card, |account| {
            ensure_active(account)?;
            if account.balance < amount {
                return Err(AtmError::insufficient_funds(
                    &account.card_number.masked(),
                    account.balance,
                    amount,
                ));
            }
            account.with_balance(account.balance - amount)
        })?;
        Ok(updated.balance)
    }

    /// Block a card
    ///
    /// Blocking an already blocked card succeeds.
    pub fn block_card(&self, card: &CardNumber) -> Result<(), AtmError> {
        self.replace(card, |account| Ok(account.clone().with_blocked(true)))?;
        warn!(card = %card.masked(), "Card blocked");
        Ok(())
    }

    /// Change the PIN of an active card
    pub fn change_pin(&self, card: &CardNumber, new_pin: &str) -> Result<(), AtmError> {
        self.replace(card, |account| {
            ensure_active(account)?;
            Ok(account.with_pin(new_pin))
        })?;
        info!(card = %card.masked(), "PIN changed");
        Ok(())
    }

    /// Mark a card as held (or no longer held) by the machine
    pub fn set_retained(&self, card: &CardNumber, retained: bool) -> Result<(), AtmError> {
        self.replace(card, |account| Ok(account.clone().with_retained(retained)))?;
        Ok(())
    }

    /// Card numbers currently flagged as retained, sorted
    pub fn retained_card_numbers(&self) -> Vec<CardNumber> {
        let mut cards: Vec<CardNumber> = self
            .accounts
            .iter()
            .filter(|entry| entry.value().is_retained)
            .map(|entry| entry.key().clone())
            .collect();
        cards.sort();
        cards
    }

    /// Clear the retained flag on collected cards
    ///
    /// Unknown cards are skipped. Cards stay blocked; unblocking is a bank
    /// decision.
    pub fn collect_retained(&self, cards: &[CardNumber]) -> Result<(), AtmError> {
        let mut previous = Vec::new();
        for card in cards {
            if let Some(mut entry) = self.accounts.get_mut(card) {
                let updated = entry.value().clone().with_retained(false);
                previous.push(std::mem::replace(entry.value_mut(), updated));
            }
        }
        if let Err(e) = self.persist() {
            self.restore(previous);
            return Err(e);
        }
        Ok(())
    }

    /// Move funds between two active accounts
    ///
    /// Either both balances change and the result is persisted, or neither
    /// changes.
    ///
    /// # Errors
    ///
    /// - [`AtmError::InvalidAmount`] if `amount` is not positive
    /// - [`AtmError::SelfTransfer`] if both cards are the same
    /// - [`AtmError::CardNotFound`] / [`AtmError::CardBlocked`] for either side
    /// - [`AtmError::InsufficientFunds`] if the source balance is too low
    pub fn transfer(
        &self,
        from: &CardNumber,
        to: &CardNumber,
        amount: Decimal,
    ) -> Result<(), AtmError> {
        if amount <= Decimal::ZERO {
            return Err(AtmError::invalid_amount(amount, "must be positive"));
        }
        if from == to {
            return Err(AtmError::SelfTransfer);
        }

        let source = self.active_account(from)?;
        let target = self.active_account(to)?;
        if source.balance < amount {
            return Err(AtmError::insufficient_funds(
                &from.masked(),
                source.balance,
                amount,
            ));
        }
        let new_target_balance = target
            .balance
            .checked_add(amount)
            .ok_or_else(|| AtmError::internal("balance overflow on transfer"))?;

        // Entries are locked one at a time; holding both guards could deadlock
        // when the cards share a shard.
        let debited = self.swap(from, |account| {
            ensure_active(account)?;
            if account.balance < amount {
                return Err(AtmError::insufficient_funds(
                    &from.masked(),
                    account.balance,
                    amount,
                ));
            }
            account.with_balance(account.balance - amount)
        })?;
        let credited = match self.swap(to, |account| {
            ensure_active(account)?;
            account.with_balance(new_target_balance)
        }) {
            Ok(previous) => previous,
            Err(e) => {
                self.restore(vec![debited]);
                return Err(e);
            }
        };

        if let Err(e) = self.persist() {
            self.restore(vec![debited, credited]);
            return Err(e);
        }

        info!(from = %from.masked(), to = %to.masked(), %amount, "Transfer completed");
        Ok(())
    }

    /// Snapshot of all accounts sorted by card number
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by(|a, b| a.card_number.cmp(&b.card_number));
        accounts
    }

    /// Look up an account that may be used for money movements
    fn active_account(&self, card: &CardNumber) -> Result<Account, AtmError> {
        let account = self.get_account(card).ok_or_else(|| AtmError::CardNotFound {
            card: card.masked(),
        })?;
        ensure_active(&account)?;
        Ok(account)
    }

    /// Replace one account and persist, restoring it if the write fails
    fn replace<F>(&self, card: &CardNumber, f: F) -> Result<Account, AtmError>
    where
        F: FnOnce(&Account) -> Result<Account, AtmError>,
    {
        let previous = self.swap(card, f)?;
        if let Err(e) = self.persist() {
            self.restore(vec![previous]);
            return Err(e);
        }
        self.get_account(card)
            .ok_or_else(|| AtmError::internal("account vanished after update"))
    }

    /// Replace one account in memory only, returning the previous value
    fn swap<F>(&self, card: &CardNumber, f: F) -> Result<Account, AtmError>
    where
        F: FnOnce(&Account) -> Result<Account, AtmError>,
    {
        let mut entry = self
            .accounts
            .get_mut(card)
            .ok_or_else(|| AtmError::CardNotFound {
                card: card.masked(),
            })?;
        let previous = entry.value().clone();
        let updated = f(&previous)?;
        if updated.card_number != previous.card_number {
            return Err(AtmError::internal("card number changed during update"));
        }
        *entry = updated;
        Ok(previous)
    }

    fn restore(&self, previous: Vec<Account>) {
        for account in previous {
            self.accounts.insert(account.card_number.clone(), account);
        }
    }

    /// Write the whole map to the repository
    fn persist(&self) -> Result<(), AtmError> {
        let _guard = self
            .persist_lock
            .lock()
            .map_err(|_| AtmError::internal("account persist lock poisoned"))?;
        self.repository.save_accounts(&self.accounts())
    }
}

fn ensure_active(account: &Account) -> Result<(), AtmError> {
    if account.is_blocked {
        return Err(AtmError::CardBlocked {
            card: account.card_number.masked(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryRepository;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    const CARD_A: &str = "1234567890123456";
    const CARD_B: &str = "1111111111111111";
    const BLOCKED: &str = "9999999999999999";

    fn card(number: &str) -> CardNumber {
        CardNumber::parse(number).unwrap()
    }

    fn store() -> (AccountStore, Arc<MemoryRepository>) {
        let repository = Arc::new(MemoryRepository::new());
        let store = AccountStore::open(repository.clone()).unwrap();
        store
            .add_account(Account::new(card(CARD_A), "0000", dec!(10000)).unwrap())
            .unwrap();
        store
            .add_account(Account::new(card(CARD_B), "1234", dec!(5000)).unwrap())
            .unwrap();
        store
            .add_account(
                Account::new(card(BLOCKED), "0000", dec!(0))
                    .unwrap()
                    .with_blocked(true),
            )
            .unwrap();
        (store, repository)
    }

    #[test]
    fn test_transfer_moves_funds() {
        let (store, repository) = store();
        store.transfer(&card(CARD_A), &card(CARD_B), dec!(200)).unwrap();

        assert_eq!(store.balance(&card(CARD_A)).unwrap(), dec!(9800));
        assert_eq!(store.balance(&card(CARD_B)).unwrap(), dec!(5200));

        let saved = repository.saved_accounts();
        let a = saved.iter().find(|a| a.card_number == card(CARD_A)).unwrap();
        assert_eq!(a.balance, dec!(9800));
    }

    #[rstest]
    #[case::zero(dec!(0))]
    #[case::negative(dec!(-50))]
    fn test_transfer_rejects_non_positive(#[case] amount: Decimal) {
        let (store, _) = store();
        let result = store.transfer(&card(CARD_A), &card(CARD_B), amount);
        assert!(matches!(result, Err(AtmError::InvalidAmount { .. })));
        assert_eq!(store.balance(&card(CARD_A)).unwrap(), dec!(10000));
        assert_eq!(store.balance(&card(CARD_B)).unwrap(), dec!(5000));
    }

    #[test]
    fn test_transfer_rejects_self_blocked_and_unknown() {
        let (store, _) = store();
        assert_eq!(
            store.transfer(&card(CARD_A), &card(CARD_A), dec!(10)),
            Err(AtmError::SelfTransfer)
        );
        assert!(matches!(
            store.transfer(&card(CARD_A), &card(BLOCKED), dec!(10)),
            Err(AtmError::CardBlocked { .. })
        ));
        assert!(matches!(
            store.transfer(&card(CARD_A), &card("2222222222222222"), dec!(10)),
            Err(AtmError::CardNotFound { .. })
        ));
        assert_eq!(store.balance(&card(CARD_A)).unwrap(), dec!(10000));
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let (store, _) = store();
        let result = store.transfer(&card(CARD_B), &card(CARD_A), dec!(5000.01));
        assert!(matches!(result, Err(AtmError::InsufficientFunds { .. })));
        assert_eq!(store.balance(&card(CARD_B)).unwrap(), dec!(5000));
    }

    #[test]
    fn test_withdraw_and_deposit() {
        let (store, _) = store();
        assert_eq!(store.withdraw(&card(CARD_A), dec!(300)).unwrap(), dec!(9700));
        assert_eq!(store.deposit(&card(CARD_A), dec!(300)).unwrap(), dec!(10000));

        let result = store.withdraw(&card(CARD_B), dec!(6000));
        assert!(matches!(result, Err(AtmError::InsufficientFunds { .. })));
        assert_eq!(store.balance(&card(CARD_B)).unwrap(), dec!(5000));
    }

    #[test]
    fn test_blocked_card_rejects_money_movements() {
        let (store, _) = store();
        let blocked = card(BLOCKED);
        assert!(store.is_blocked(&blocked));
        assert!(matches!(store.deposit(&blocked, dec!(1)), Err(AtmError::CardBlocked { .. })));
        assert!(matches!(
            store.update_balance(&blocked, dec!(1)),
            Err(AtmError::CardBlocked { .. })
        ));
        assert!(matches!(store.change_pin(&blocked, "1111"), Err(AtmError::CardBlocked { .. })));
    }

    #[test]
    fn test_block_and_validate_pin() {
        let (store, _) = store();
        let a = card(CARD_A);
        assert!(store.validate_pin(&a, "0000"));
        assert!(!store.validate_pin(&a, "1111"));
        assert!(!store.validate_pin(&card("2222222222222222"), "0000"));

        store.block_card(&a).unwrap();
        assert!(store.is_blocked(&a));
    }

    #[test]
    fn test_change_pin() {
        let (store, _) = store();
        let a = card(CARD_A);
        store.change_pin(&a, "4321").unwrap();
        assert!(store.validate_pin(&a, "4321"));
        assert!(!store.validate_pin(&a, "0000"));
    }

    #[test]
    fn test_retained_flags() {
        let (store, _) = store();
        store.set_retained(&card(CARD_B), true).unwrap();
        store.set_retained(&card(CARD_A), true).unwrap();
        assert_eq!(
            store.retained_card_numbers(),
            vec![card(CARD_B), card(CARD_A)]
        );

        store.collect_retained(&[card(CARD_A), card(CARD_B)]).unwrap();
        assert!(store.retained_card_numbers().is_empty());
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let (store, repository) = store();
        repository.fail_saves(true);

        let result = store.withdraw(&card(CARD_A), dec!(100));
        assert!(matches!(result, Err(AtmError::Storage { .. })));
        assert_eq!(store.balance(&card(CARD_A)).unwrap(), dec!(10000));

        let result = store.transfer(&card(CARD_A), &card(CARD_B), dec!(100));
        assert!(matches!(result, Err(AtmError::Storage { .. })));
        assert_eq!(store.balance(&card(CARD_A)).unwrap(), dec!(10000));
        assert_eq!(store.balance(&card(CARD_B)).unwrap(), dec!(5000));
    }

    #[test]
    fn test_seed_only_when_empty() {
        let repository = Arc::new(MemoryRepository::new());
        let store = AccountStore::open(repository.clone()).unwrap();
        let seed = vec![Account::new(card(CARD_A), "0000", dec!(1)).unwrap()];

        assert!(store.seed_if_empty(seed.clone()).unwrap());
        assert_eq!(repository.saved_accounts().len(), 1);
        assert!(!store.seed_if_empty(seed).unwrap());
    }

    #[test]
    fn test_open_loads_existing_accounts() {
        let (_, repository) = store();
        let reopened = AccountStore::open(repository).unwrap();
        assert_eq!(reopened.accounts().len(), 3);
        assert_eq!(reopened.balance(&card(CARD_B)).unwrap(), dec!(5000));
    }
}
