//! Cash-related types
//!
//! Note bundles are plain ordered maps from denomination to note count. Using
//! a `BTreeMap` keeps iteration, display, and persistence deterministic.

use super::error::AtmError;
use std::collections::BTreeMap;

/// Face value of a banknote, in whole currency units
pub type Denomination = u32;

/// A bundle of notes: denomination to count
pub type Notes = BTreeMap<Denomination, u32>;

/// Total value of a bundle of notes
pub fn notes_total(notes: &Notes) -> u64 {
    notes
        .iter()
        .map(|(denom, count)| u64::from(*denom) * u64::from(*count))
        .sum()
}

/// Parse a note list such as `100:3 50:2`
///
/// Entries are whitespace separated `denomination:count` pairs. Repeated
/// denominations are summed. An empty input yields an empty bundle.
///
/// # Errors
///
/// Returns [`AtmError::InvalidInput`] for malformed pairs, non-numeric
/// values, or repeated counts that overflow.
pub fn parse_notes(input: &str) -> Result<Notes, AtmError> {
    let mut notes = Notes::new();
    for part in input.split_whitespace() {
        let (denom, count) = part
            .split_once(':')
            .ok_or_else(|| AtmError::invalid_input(format!("expected denom:count, got '{}'", part)))?;
        let denom: Denomination = denom
            .trim()
            .parse()
            .map_err(|_| AtmError::invalid_input(format!("bad denomination '{}'", denom)))?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| AtmError::invalid_input(format!("bad note count '{}'", count)))?;
        let slot = notes.entry(denom).or_insert(0);
        *slot = slot
            .checked_add(count)
            .ok_or_else(|| AtmError::invalid_input(format!("too many {} notes", denom)))?;
    }
    Ok(notes)
}

/// Render a bundle as `100x3, 50x2`
pub fn format_notes(notes: &Notes) -> String {
    notes
        .iter()
        .rev()
        .map(|(denom, count)| format!("{}x{}", denom, count))
        .collect::<Vec<_>>()
        .join(", ")
}
