//! Cash inventory
//!
//! This module provides the `CashInventory`, the cassette counts of the
//! machine and the note selection used when dispensing.
//!
//! # Dispense algorithm
//!
//! Notes are chosen greedily, highest denomination first: at each
//! denomination take `min(remaining / denom, available)` notes. An amount is
//! dispensable iff the remainder reaches exactly zero. Greedy selection is
//! not optimal change-making; with counts `{50: 3, 20: 5}` an amount of 200
//! fails even though `50x2 + 20x5` exists. That limitation is kept so the planner
//! stays predictable for operators reading the cassettes.
//!
//! Every mutation is persisted through the [`InventoryRepository`] before it
//! is reported as done. A failed write restores the previous counts.

use crate::core::traits::InventoryRepository;
use crate::types::{format_notes, notes_total, AtmError, Denomination, Notes};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Cassette counts for a fixed set of denominations
pub struct CashInventory {
    /// Configured denominations, highest first
    denominations: Vec<Denomination>,
    /// Current count per configured denomination
    counts: Notes,
    /// Every dispensed amount must be a multiple of this
    unit: u64,
    /// Count used for cassettes with no saved state
    initial_per_cassette: u32,
    repository: Arc<dyn InventoryRepository>,
}

impl CashInventory {
    /// Load the inventory, filling unsaved cassettes with the initial count
    ///
    /// # Arguments
    ///
    /// * `repository` - Durable storage for the counts
    /// * `denominations` - Configured cassette denominations, any order
    /// * `initial_per_cassette` - Count for cassettes absent from storage
    /// * `unit` - Smallest dispensable step (100 in the default setup)
    ///
    /// # Errors
    ///
    /// Returns a storage error if the saved counts cannot be read, or if a
    /// freshly initialised inventory cannot be written.
    pub fn open(
        repository: Arc<dyn InventoryRepository>,
        denominations: &[Denomination],
        initial_per_cassette: u32,
        unit: u64,
    ) -> Result<Self, AtmError> {
        let mut denominations: Vec<Denomination> = denominations
            .iter()
            .copied()
            .filter(|denom| *denom > 0)
            .collect();
        denominations.sort_unstable_by(|a, b| b.cmp(a));
        denominations.dedup();

        let mut inventory = CashInventory {
            denominations,
            counts: Notes::new(),
            unit: unit.max(1),
            initial_per_cassette,
            repository,
        };
        inventory.reload()?;
        Ok(inventory)
    }

    /// Re-read the counts from storage
    ///
    /// Unknown denominations in storage are ignored. When nothing was ever
    /// saved, every cassette gets the initial count and that state is saved.
    pub fn reload(&mut self) -> Result<(), AtmError> {
        let saved = self.repository.load_inventory()?;
        let fresh = saved.is_none();
        let saved = saved.unwrap_or_default();

        self.counts = self
            .denominations
            .iter()
            .map(|denom| {
                let count = saved
                    .get(denom)
                    .copied()
                    .unwrap_or(self.initial_per_cassette);
                (*denom, count)
            })
            .collect();

        if fresh {
            self.repository.save_inventory(&self.counts)?;
        }
        debug!(total = self.total(), "Cash inventory loaded");
        Ok(())
    }

    /// Configured denominations, highest first
    pub fn denominations(&self) -> &[Denomination] {
        &self.denominations
    }

    pub fn counts(&self) -> &Notes {
        &self.counts
    }

    /// Notes left in one cassette; zero for unknown denominations
    pub fn count(&self, denomination: Denomination) -> u32 {
        self.counts.get(&denomination).copied().unwrap_or(0)
    }

    /// Total value held
    pub fn total(&self) -> u64 {
        notes_total(&self.counts)
    }

    pub fn supports(&self, denomination: Denomination) -> bool {
        self.counts.contains_key(&denomination)
    }

    /// Greedy note selection for `amount`, without touching the counts
    ///
    /// Returns `None` when the amount is zero, not a multiple of the unit, or
    /// cannot be made exactly from the available notes.
    pub fn plan(&self, amount: u64) -> Option<Notes> {
        if amount == 0 || amount % self.unit != 0 {
            return None;
        }
        let (plan, remainder) = greedy(&self.denominations, &self.counts, amount);
        (remainder == 0).then_some(plan)
    }

    pub fn can_dispense(&self, amount: u64) -> bool {
        self.plan(amount).is_some()
    }

    /// Remove notes worth exactly `amount`
    ///
    /// # Returns
    ///
    /// The notes handed out, denomination to count
    ///
    /// # Errors
    ///
    /// - [`AtmError::InvalidAmount`] if the amount is zero or not a multiple
    ///   of the unit
    /// - [`AtmError::InsufficientCash`] if the notes cannot make the amount
    /// - [`AtmError::Internal`] if the greedy pass over the live counts does
    ///   not reach zero after planning succeeded
    /// - [`AtmError::Storage`] if the new counts cannot be saved
    ///
    /// The counts are unchanged on every error.
    pub fn dispense(&mut self, amount: u64) -> Result<Notes, AtmError> {
        if amount == 0 || amount % self.unit != 0 {
            return Err(AtmError::invalid_amount(
                amount,
                &format!("must be a positive multiple of {}", self.unit),
            ));
        }
        if !self.can_dispense(amount) {
            return Err(AtmError::InsufficientCash { requested: amount });
        }

        let mut counts = self.counts.clone();
        let mut remaining = amount;
        let mut dispensed = Notes::new();
        for denom in &self.denominations {
            let value = u64::from(*denom);
            let Some(available) = counts.get_mut(denom) else {
                continue;
            };
            let take = (remaining / value).min(u64::from(*available));
            if take == 0 {
                continue;
            }
            // `take` is bounded by a u32 count
            let take = take as u32;
            *available -= take;
            remaining -= value * u64::from(take);
            dispensed.insert(*denom, take);
        }

        if remaining != 0 {
            error!(amount, remaining, "Dispense disagreed with plan");
            return Err(AtmError::internal(format!(
                "dispense of {} left remainder {} after a successful plan",
                amount, remaining
            )));
        }

        self.commit(counts)?;
        info!(amount, notes = %format_notes(&dispensed), "Cash dispensed");
        Ok(dispensed)
    }

    /// Take notes in from a customer deposit
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::UnsupportedDenomination`] if any note has no
    /// cassette; nothing is added in that case.
    pub fn accept(&mut self, notes: &Notes) -> Result<(), AtmError> {
        self.add(notes)?;
        info!(amount = notes_total(notes), notes = %format_notes(notes), "Cash accepted");
        Ok(())
    }

    /// Load notes into the cassettes
    pub fn replenish(&mut self, notes: &Notes) -> Result<(), AtmError> {
        self.add(notes)?;
        info!(amount = notes_total(notes), notes = %format_notes(notes), "Cassettes replenished");
        Ok(())
    }

    /// Take notes out of the cassettes
    ///
    /// # Errors
    ///
    /// - [`AtmError::UnsupportedDenomination`] for a denomination with no
    ///   cassette
    /// - [`AtmError::InsufficientNotes`] if a cassette holds fewer notes than
    ///   requested
    pub fn collect(&mut self, notes: &Notes) -> Result<(), AtmError> {
        let mut counts = self.counts.clone();
        for (denom, requested) in notes {
            let available = counts
                .get_mut(denom)
                .ok_or(AtmError::UnsupportedDenomination { denomination: *denom })?;
            if *available < *requested {
                return Err(AtmError::InsufficientNotes {
                    denomination: *denom,
                    available: *available,
                    requested: *requested,
                });
            }
            *available -= requested;
        }
        self.commit(counts)?;
        info!(amount = notes_total(notes), notes = %format_notes(notes), "Cash collected");
        Ok(())
    }

    /// Overwrite the count of one cassette
    ///
    /// # Returns
    ///
    /// The count the cassette held before
    pub fn replace_cassette(&mut self, denomination: Denomination, count: u32) -> Result<u32, AtmError> {
        let mut counts = self.counts.clone();
        let slot = counts
            .get_mut(&denomination)
            .ok_or(AtmError::UnsupportedDenomination { denomination })?;
        let previous = std::mem::replace(slot, count);
        self.commit(counts)?;
        info!(denomination, previous, count, "Cassette replaced");
        Ok(previous)
    }

    fn add(&mut self, notes: &Notes) -> Result<(), AtmError> {
        let mut counts = self.counts.clone();
        for (denom, added) in notes {
            let slot = counts
                .get_mut(denom)
                .ok_or(AtmError::UnsupportedDenomination { denomination: *denom })?;
            *slot = slot
                .checked_add(*added)
                .ok_or_else(|| AtmError::invalid_input(format!("too many {} notes", denom)))?;
        }
        self.commit(counts)
    }

    /// Persist new counts, then make them current
    fn commit(&mut self, counts: Notes) -> Result<(), AtmError> {
        self.repository.save_inventory(&counts)?;
        self.counts = counts;
        Ok(())
    }
}

/// One greedy pass; returns the chosen notes and the remainder
fn greedy(denominations: &[Denomination], counts: &Notes, amount: u64) -> (Notes, u64) {
    let mut remaining = amount;
    let mut plan = Notes::new();
    for denom in denominations {
        let value = u64::from(*denom);
        let available = u64::from(counts.get(denom).copied().unwrap_or(0));
        let take = (remaining / value).min(available);
        if take > 0 {
            remaining -= take * value;
            plan.insert(*denom, take as u32);
        }
    }
    (plan, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryRepository;
    use rstest::rstest;

    const DENOMINATIONS: [Denomination; 6] = [20, 50, 100, 200, 500, 1000];

    fn notes(pairs: &[(Denomination, u32)]) -> Notes {
        pairs.iter().copied().collect()
    }

    /// Inventory whose configured cassettes are all empty except `pairs`
    fn inventory(pairs: &[(Denomination, u32)]) -> (CashInventory, Arc<MemoryRepository>) {
        let mut counts: Notes = DENOMINATIONS.iter().map(|d| (*d, 0)).collect();
        counts.extend(pairs.iter().copied());
        let repository = Arc::new(MemoryRepository::new().with_inventory(counts));
        let inventory = CashInventory::open(repository.clone(), &DENOMINATIONS, 50, 100).unwrap();
        (inventory, repository)
    }

    #[test]
    fn test_fresh_inventory_uses_initial_count() {
        let repository = Arc::new(MemoryRepository::new());
        let inventory = CashInventory::open(repository.clone(), &DENOMINATIONS, 50, 100).unwrap();

        assert_eq!(inventory.denominations(), &[1000, 500, 200, 100, 50, 20]);
        assert_eq!(inventory.count(100), 50);
        assert_eq!(inventory.total(), 50 * (20 + 50 + 100 + 200 + 500 + 1000));
        assert_eq!(repository.saved_inventory().as_ref(), Some(inventory.counts()));
    }

    #[test]
    fn test_saved_counts_override_initial_and_unknown_are_ignored() {
        let repository =
            Arc::new(MemoryRepository::new().with_inventory(notes(&[(100, 7), (5, 9)])));
        let inventory = CashInventory::open(repository, &DENOMINATIONS, 50, 100).unwrap();
        assert_eq!(inventory.count(100), 7);
        assert_eq!(inventory.count(200), 50);
        assert!(!inventory.supports(5));
    }

    #[test]
    fn test_dispense_scenario() {
        let (mut inventory, repository) = inventory(&[(100, 5), (50, 2)]);

        let dispensed = inventory.dispense(300).unwrap();
        assert_eq!(dispensed, notes(&[(100, 3)]));
        assert_eq!(inventory.count(100), 2);
        assert_eq!(inventory.count(50), 2);
        assert_eq!(repository.saved_inventory().unwrap().get(&100), Some(&2));
    }

    #[rstest]
    #[case::thirty(30)]
    #[case::one_fifty(150)]
    #[case::zero(0)]
    fn test_non_multiple_rejected_without_mutation(#[case] amount: u64) {
        let (mut inventory, _) = inventory(&[(100, 5), (50, 2)]);
        let before = inventory.counts().clone();

        assert!(!inventory.can_dispense(amount));
        assert!(matches!(
            inventory.dispense(amount),
            Err(AtmError::InvalidAmount { .. })
        ));
        assert_eq!(inventory.counts(), &before);
    }

    #[rstest]
    #[case::large_notes(1800, &[(1000, 1), (500, 1), (200, 1), (100, 1)])]
    #[case::skips_large(700, &[(500, 1), (200, 1)])]
    #[case::falls_to_fifties(1900, &[(1000, 1), (500, 1), (200, 1), (100, 1), (50, 2)])]
    #[case::everything(2000, &[(1000, 1), (500, 1), (200, 1), (100, 1), (50, 2), (20, 5)])]
    fn test_dispensed_notes_sum_to_amount(
        #[case] amount: u64,
        #[case] expected: &[(Denomination, u32)],
    ) {
        let (mut inventory, _) =
            inventory(&[(1000, 1), (500, 1), (200, 1), (100, 1), (50, 2), (20, 5)]);
        assert!(inventory.can_dispense(amount));

        let dispensed = inventory.dispense(amount).unwrap();
        assert_eq!(notes_total(&dispensed), amount);
        assert_eq!(dispensed, notes(expected));
    }

    #[test]
    fn test_greedy_is_not_optimal() {
        // 50x3 leaves 50, which twenties cannot make; 50x2 + 20x5 would work
        let (mut inventory, _) = inventory(&[(50, 3), (20, 5)]);
        assert!(!inventory.can_dispense(200));
        assert!(matches!(
            inventory.dispense(200),
            Err(AtmError::InsufficientCash { requested: 200 })
        ));
        assert_eq!(inventory.count(50), 3);
        assert_eq!(inventory.count(20), 5);
    }

    #[test]
    fn test_insufficient_cash() {
        let (mut inventory, _) = inventory(&[(100, 2)]);
        assert!(!inventory.can_dispense(300));
        assert!(matches!(
            inventory.dispense(300),
            Err(AtmError::InsufficientCash { .. })
        ));
        assert_eq!(inventory.count(100), 2);
    }

    #[test]
    fn test_failed_save_keeps_counts() {
        let (mut inventory, repository) = inventory(&[(100, 5)]);
        repository.fail_saves(true);

        assert!(matches!(inventory.dispense(200), Err(AtmError::Storage { .. })));
        assert!(matches!(
            inventory.replenish(&notes(&[(100, 1)])),
            Err(AtmError::Storage { .. })
        ));
        assert_eq!(inventory.count(100), 5);
    }

    #[test]
    fn test_accept_and_replenish() {
        let (mut inventory, _) = inventory(&[(100, 1)]);
        inventory.accept(&notes(&[(100, 2), (50, 1)])).unwrap();
        inventory.replenish(&notes(&[(1000, 10)])).unwrap();
        assert_eq!(inventory.count(100), 3);
        assert_eq!(inventory.count(50), 1);
        assert_eq!(inventory.count(1000), 10);
    }

    #[test]
    fn test_unsupported_denomination_adds_nothing() {
        let (mut inventory, _) = inventory(&[(100, 1)]);
        let result = inventory.accept(&notes(&[(100, 2), (5, 1)]));
        assert_eq!(result, Err(AtmError::UnsupportedDenomination { denomination: 5 }));
        assert_eq!(inventory.count(100), 1);
    }

    #[test]
    fn test_collect() {
        let (mut inventory, _) = inventory(&[(100, 5), (50, 2)]);
        inventory.collect(&notes(&[(100, 3)])).unwrap();
        assert_eq!(inventory.count(100), 2);

        let result = inventory.collect(&notes(&[(100, 1), (50, 3)]));
        assert_eq!(
            result,
            Err(AtmError::InsufficientNotes {
                denomination: 50,
                available: 2,
                requested: 3
            })
        );
        assert_eq!(inventory.count(100), 2);
    }

    #[test]
    fn test_replace_cassette() {
        let (mut inventory, _) = inventory(&[(200, 4)]);
        assert_eq!(inventory.replace_cassette(200, 40).unwrap(), 4);
        assert_eq!(inventory.count(200), 40);
        assert!(matches!(
            inventory.replace_cassette(7, 1),
            Err(AtmError::UnsupportedDenomination { denomination: 7 })
        ));
    }

    #[test]
    fn test_reload_reads_saved_counts() {
        let (mut inventory, repository) = inventory(&[(100, 5)]);
        let mut saved = repository.saved_inventory().unwrap();
        saved.insert(100, 1);
        repository.save_inventory(&saved).unwrap();

        inventory.reload().unwrap();
        assert_eq!(inventory.count(100), 1);
    }
}
