//! Card reader slot and retention bin

use crate::types::{AtmError, Card, CardNumber};
use tracing::{info, warn};

/// Bin of cards the machine has swallowed
///
/// Cards are kept in the order they were retained. A technician drains the
/// whole bin in one step.
#[derive(Debug, Default)]
pub struct CardRetainer {
    cards: Vec<Card>,
}

impl CardRetainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the bin from card numbers recorded as retained
    pub fn from_card_numbers(numbers: impl IntoIterator<Item = CardNumber>) -> Self {
        CardRetainer {
            cards: numbers
                .into_iter()
                .map(|number| Card::new(number, None, None))
                .collect(),
        }
    }

    pub fn retain(&mut self, card: Card) {
        warn!(card = %card.number.masked(), "Card retained");
        self.cards.push(card);
    }

    /// Remove and return every retained card
    pub fn collect_all(&mut self) -> Vec<Card> {
        std::mem::take(&mut self.cards)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Single card slot
#[derive(Debug, Default)]
pub struct CardReader {
    current: Option<Card>,
}

impl CardReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a card into the slot
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::CardAlreadyPresent`] if the slot is occupied; the
    /// card already inside is kept.
    pub fn insert(&mut self, card: Card) -> Result<(), AtmError> {
        if self.current.is_some() {
            return Err(AtmError::CardAlreadyPresent);
        }
        info!(card = %card.number.masked(), "Card inserted");
        self.current = Some(card);
        Ok(())
    }

    /// Hand the card back; `None` if the slot was empty
    pub fn eject(&mut self) -> Option<Card> {
        let card = self.current.take()?;
        info!(card = %card.number.masked(), "Card ejected");
        Some(card)
    }

    /// Move the card from the slot into the retention bin
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::NoCardInserted`] if the slot is empty.
    pub fn retain_into(&mut self, retainer: &mut CardRetainer) -> Result<CardNumber, AtmError> {
        let card = self.current.take().ok_or(AtmError::NoCardInserted)?;
        let number = card.number.clone();
        retainer.retain(card);
        Ok(number)
    }

    pub fn current(&self) -> Option<&Card> {
        self.current.as_ref()
    }

    pub fn has_card(&self) -> bool {
        self.current.is_some()
    }
}
