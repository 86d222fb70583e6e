//! Receipt types
//!
//! Every client transaction produces a `Receipt`, whether it succeeded or
//! not. Receipts are shown on screen and appended to the receipt journal.

use super::card::CardNumber;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Client operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    BalanceInquiry,
    Withdrawal,
    Deposit,
    Transfer,
    Payment,
    PinChange,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::BalanceInquiry => "balance",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Payment => "payment",
            TransactionKind::PinChange => "pin_change",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failed,
}

impl fmt::Display for ReceiptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiptStatus::Success => f.write_str("success"),
            ReceiptStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Record of one client transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub timestamp: DateTime<Utc>,
    pub card: CardNumber,
    pub kind: TransactionKind,
    /// Amount moved, if the operation moves money
    pub amount: Option<Decimal>,
    /// Balance after the operation, if known
    pub balance_after: Option<Decimal>,
    pub status: ReceiptStatus,
    /// Free text: notes dispensed, recipient, service, or failure reason
    pub detail: String,
}

impl Receipt {
    pub fn success(card: &CardNumber, kind: TransactionKind) -> Self {
        Receipt {
            timestamp: Utc::now(),
            card: card.clone(),
            kind,
            amount: None,
            balance_after: None,
            status: ReceiptStatus::Success,
            detail: String::new(),
        }
    }

    pub fn failed(card: &CardNumber, kind: TransactionKind, reason: impl Into<String>) -> Self {
        Receipt {
            status: ReceiptStatus::Failed,
            detail: reason.into(),
            ..Receipt::success(card, kind)
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance_after = Some(balance);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// Screen rendering of the receipt
    pub fn render(&self, currency: &str) -> String {
        let mut lines = vec![
            "------ RECEIPT ------".to_string(),
            format!("Date: {}", self.timestamp.format("%Y-%m-%d %H:%M:%S")),
            format!("Card: {}", self.card.masked()),
            format!("Operation: {}", self.kind),
        ];
        if let Some(amount) = self.amount {
            lines.push(format!("Amount: {:.2} {}", amount, currency));
        }
        if let Some(balance) = self.balance_after {
            lines.push(format!("Balance: {:.2} {}", balance, currency));
        }
        if !self.detail.is_empty() {
            lines.push(self.detail.clone());
        }
        lines.push(format!("Status: {}", self.status));
        lines.push("---------------------".to_string());
        lines.join("\n")
    }
}
