//! Client transaction executors
//!
//! Each client operation is a small command object. The state machine
//! collects the inputs, builds the command, and calls
//! [`Transaction::execute`] once. Executors never prompt; they only touch
//! the account store and the cash inventory through a
//! [`TransactionContext`].
//!
//! # Money movement rules
//!
//! - Withdrawal debits the account first and dispenses second. If the
//!   dispense fails the debit is reversed before the error is returned.
//! - Deposit takes the notes into the cassettes first and credits second.
//!   If the credit fails the notes are handed back out.
//! - A failed reversal leaves money and cash out of step, which is an
//!   internal error.

use crate::core::account_store::AccountStore;
use crate::core::cash_inventory::CashInventory;
use crate::types::{
    format_notes, notes_total, AtmConfig, AtmError, CardNumber, Notes, Receipt, TransactionKind,
};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{error, info, warn};

/// What an executor may touch
pub struct TransactionContext<'a> {
    /// Card of the authenticated client
    pub card: &'a CardNumber,
    pub accounts: &'a AccountStore,
    pub inventory: &'a mut CashInventory,
    pub config: &'a AtmConfig,
}

/// Single-shot client operation
pub trait Transaction {
    fn kind(&self) -> TransactionKind;

    /// Run the operation
    ///
    /// # Errors
    ///
    /// Non-fatal errors describe why the operation was refused; nothing was
    /// changed. Fatal errors ([`AtmError::is_fatal`]) end the session.
    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError>;
}

/// Parse a money amount typed by the user
///
/// The amount must be positive with at most two decimal places.
pub fn parse_money(input: &str) -> Result<Decimal, AtmError> {
    let input = input.trim();
    let amount = Decimal::from_str(input)
        .map_err(|_| AtmError::invalid_amount(input, "not a number"))?;
    if amount <= Decimal::ZERO {
        return Err(AtmError::invalid_amount(input, "must be positive"));
    }
    if amount.normalize().scale() > 2 {
        return Err(AtmError::invalid_amount(input, "at most two decimal places"));
    }
    Ok(amount)
}

/// Parse a whole-unit withdrawal amount
pub fn parse_cash_amount(input: &str) -> Result<u64, AtmError> {
    let input = input.trim();
    input
        .parse::<u64>()
        .map_err(|_| AtmError::invalid_amount(input, "must be a whole number"))
}

pub struct BalanceInquiry;

impl Transaction for BalanceInquiry {
    fn kind(&self) -> TransactionKind {
        TransactionKind::BalanceInquiry
    }

    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError> {
        let balance = ctx.accounts.balance(ctx.card)?;
        Ok(Receipt::success(ctx.card, self.kind()).with_balance(balance))
    }
}

/// Cash withdrawal with compensation on dispense failure
pub struct WithdrawalTransaction {
    pub amount: u64,
}

impl WithdrawalTransaction {
    pub fn new(amount: u64) -> Self {
        WithdrawalTransaction { amount }
    }

    /// Check the amount against the configured limits
    pub fn validate(&self, config: &AtmConfig) -> Result<(), AtmError> {
        let amount = self.amount;
        if config.withdrawal_unit == 0 || amount % config.withdrawal_unit != 0 {
            return Err(AtmError::invalid_amount(
                amount,
                &format!("must be a multiple of {}", config.withdrawal_unit),
            ));
        }
        if amount < config.min_withdrawal {
            return Err(AtmError::invalid_amount(
                amount,
                &format!("minimum is {}", config.min_withdrawal),
            ));
        }
        if amount > config.max_withdrawal {
            return Err(AtmError::invalid_amount(
                amount,
                &format!("maximum is {}", config.max_withdrawal),
            ));
        }
        Ok(())
    }
}

impl Transaction for WithdrawalTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Withdrawal
    }

    /// Debit, then dispense
    ///
    /// # Steps
    ///
    /// 1. Validate the amount (unit, minimum, maximum).
    /// 2. Refuse early if the cassettes cannot make the amount.
    /// 3. Debit the account.
    /// 4. Dispense; on failure credit the amount back and return the
    ///    dispense error.
    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError> {
        self.validate(ctx.config)?;
        if !ctx.inventory.can_dispense(self.amount) {
            return Err(AtmError::InsufficientCash {
                requested: self.amount,
            });
        }

        let amount = Decimal::from(self.amount);
        let balance = ctx.accounts.withdraw(ctx.card, amount)?;

        let notes = match ctx.inventory.dispense(self.amount) {
            Ok(notes) => notes,
            Err(dispense_error) => {
                warn!(card = %ctx.card.masked(), error = %dispense_error, "Dispense failed, reversing debit");
                if let Err(credit_error) = ctx.accounts.deposit(ctx.card, amount) {
                    error!(
                        card = %ctx.card.masked(),
                        %amount,
                        error = %credit_error,
                        "Debit reversal failed"
                    );
                    return Err(AtmError::internal(format!(
                        "account debited {} without cash: {}; reversal failed: {}",
                        amount, dispense_error, credit_error
                    )));
                }
                return Err(dispense_error);
            }
        };

        info!(card = %ctx.card.masked(), amount = self.amount, "Withdrawal completed");
        Ok(Receipt::success(ctx.card, self.kind())
            .with_amount(amount)
            .with_balance(balance)
            .with_detail(format!("Notes: {}", format_notes(&notes))))
    }
}

/// Cash deposit of counted notes
pub struct DepositTransaction {
    pub notes: Notes,
}

impl DepositTransaction {
    pub fn new(notes: Notes) -> Self {
        DepositTransaction { notes }
    }
}

impl Transaction for DepositTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Deposit
    }

    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError> {
        let total = notes_total(&self.notes);
        if total == 0 {
            return Err(AtmError::invalid_amount(total, "no notes inserted"));
        }
        // Refuse before taking the cash
        ctx.accounts.balance(ctx.card)?;

        ctx.inventory.accept(&self.notes)?;
        let amount = Decimal::from(total);
        let balance = match ctx.accounts.deposit(ctx.card, amount) {
            Ok(balance) => balance,
            Err(credit_error) => {
                warn!(card = %ctx.card.masked(), error = %credit_error, "Credit failed, returning notes");
                if let Err(return_error) = ctx.inventory.collect(&self.notes) {
                    error!(error = %return_error, "Returning deposited notes failed");
                    return Err(AtmError::internal(format!(
                        "notes worth {} kept without credit: {}; return failed: {}",
                        total, credit_error, return_error
                    )));
                }
                return Err(credit_error);
            }
        };

        info!(card = %ctx.card.masked(), amount = total, "Deposit completed");
        Ok(Receipt::success(ctx.card, self.kind())
            .with_amount(amount)
            .with_balance(balance)
            .with_detail(format!("Notes: {}", format_notes(&self.notes))))
    }
}

pub struct TransferTransaction {
    pub to: CardNumber,
    pub amount: Decimal,
}

impl Transaction for TransferTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Transfer
    }

    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError> {
        ctx.accounts.transfer(ctx.card, &self.to, self.amount)?;
        let balance = ctx.accounts.balance(ctx.card)?;
        Ok(Receipt::success(ctx.card, self.kind())
            .with_amount(self.amount)
            .with_balance(balance)
            .with_detail(format!("To card: {}", self.to.masked())))
    }
}

/// Payment for a named service
pub struct PaymentTransaction {
    pub service: String,
    pub amount: Decimal,
}

impl Transaction for PaymentTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::Payment
    }

    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError> {
        let service = self.service.trim();
        if service.is_empty() {
            return Err(AtmError::invalid_input("service name is required"));
        }
        let balance = ctx.accounts.withdraw(ctx.card, self.amount)?;
        info!(card = %ctx.card.masked(), service, amount = %self.amount, "Payment completed");
        Ok(Receipt::success(ctx.card, self.kind())
            .with_amount(self.amount)
            .with_balance(balance)
            .with_detail(format!("Service: {}", service)))
    }
}

pub struct PinChangeTransaction {
    pub current_pin: String,
    pub new_pin: String,
    pub confirm_pin: String,
}

impl Transaction for PinChangeTransaction {
    fn kind(&self) -> TransactionKind {
        TransactionKind::PinChange
    }

    fn execute(&self, ctx: &mut TransactionContext<'_>) -> Result<Receipt, AtmError> {
        if !ctx.accounts.validate_pin(ctx.card, &self.current_pin) {
            return Err(AtmError::AuthenticationFailed);
        }
        let length = ctx.config.pin_length;
        if self.new_pin.len() != length || !self.new_pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(AtmError::InvalidPinFormat { length });
        }
        if self.new_pin != self.confirm_pin {
            return Err(AtmError::PinMismatch);
        }
        ctx.accounts.change_pin(ctx.card, &self.new_pin)?;
        Ok(Receipt::success(ctx.card, self.kind()).with_detail("PIN changed"))
    }
}
