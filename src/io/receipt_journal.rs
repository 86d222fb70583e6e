//! Receipt journals
//!
//! `CsvReceiptJournal` appends one row per client transaction with columns
//! `timestamp, card, transaction, amount, balance_after, status, detail`.
//! The header is written only when the file is created. Card numbers are
//! masked.
//!
//! `MemoryReceiptJournal` keeps receipts in memory behind a shared handle.

use crate::core::traits::ReceiptJournal;
use crate::types::{AtmError, Receipt};
use csv::Writer;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const HEADER: [&str; 7] = [
    "timestamp",
    "card",
    "transaction",
    "amount",
    "balance_after",
    "status",
    "detail",
];

/// Journal appended to a CSV file
pub struct CsvReceiptJournal {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvReceiptJournal {
    /// Open `path` for appending, creating it with a header if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AtmError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let is_new = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut writer = Writer::from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(CsvReceiptJournal { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReceiptJournal for CsvReceiptJournal {
    fn record(&mut self, receipt: &Receipt) -> Result<(), AtmError> {
        self.writer.write_record([
            receipt.timestamp.to_rfc3339(),
            receipt.card.masked(),
            receipt.kind.to_string(),
            receipt
                .amount
                .map(|amount| format!("{:.2}", amount))
                .unwrap_or_default(),
            receipt
                .balance_after
                .map(|balance| format!("{:.2}", balance))
                .unwrap_or_default(),
            receipt.status.to_string(),
            receipt.detail.clone(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Journal held in memory; clones share the same receipts
#[derive(Debug, Clone, Default)]
pub struct MemoryReceiptJournal {
    receipts: Arc<Mutex<Vec<Receipt>>>,
}

impl MemoryReceiptJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn receipts(&self) -> Vec<Receipt> {
        self.receipts
            .lock()
            .map(|receipts| receipts.clone())
            .unwrap_or_default()
    }
}

impl ReceiptJournal for MemoryReceiptJournal {
    fn record(&mut self, receipt: &Receipt) -> Result<(), AtmError> {
        self.receipts
            .lock()
            .map_err(|_| AtmError::internal("receipt journal lock poisoned"))?
            .push(receipt.clone());
        Ok(())
    }
}
