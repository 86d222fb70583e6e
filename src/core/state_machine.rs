//! Client session state machine
//!
//! This module provides the `AtmStateMachine`, which sequences a client
//! session from card insertion to card return.
//!
//! # States
//!
//! ```text
//! NoCard ──card──▶ CardInserted ──▶ EnteringPin ──PIN ok──▶ Authenticated ◀──▶ Withdrawal
//!   ▲                                   │                        │
//!   │                        blocked: retain card                │ exit / timeout
//!   │                                   ▼                        ▼
//!   └──────────────────────────────── NoCard ◀──────────── SessionEnding
//! ```
//!
//! `handle` runs the current state's logic exactly once. `change_state`
//! runs the exit hook of the old state, then the enter hook of the new one,
//! and logs the transition.
//!
//! # Lockout
//!
//! The wrong-PIN counter lives in the [`Authenticator`](crate::core::Authenticator).
//! `EnteringPin` carries a copy for display, refreshed from the
//! authenticator when the state is entered and after every attempt, so the
//! retention below and the card block always fire together.

use crate::core::authenticator::AuthOutcome;
use crate::core::context::AtmContext;
use crate::core::timer::Prompt;
use crate::core::transaction::{
    parse_cash_amount, parse_money, BalanceInquiry, DepositTransaction, PaymentTransaction,
    PinChangeTransaction, TransferTransaction, WithdrawalTransaction,
};
use crate::types::{parse_notes, AtmError, Card, CardNumber, SessionKind};
use std::fmt;
use tracing::{debug, error, info, warn};

const MAIN_MENU: [&str; 7] = [
    "Balance",
    "Withdraw cash",
    "Deposit cash",
    "Transfer",
    "Pay for services",
    "Change PIN",
    "Exit",
];

/// Client path states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmState {
    /// Waiting for a card; the only untimed state
    NoCard,
    CardInserted,
    /// Waiting for a PIN
    EnteringPin { attempts_left: u32 },
    /// Main menu
    Authenticated,
    /// Waiting for a withdrawal amount
    Withdrawal,
    /// Returning the card and closing the session
    SessionEnding,
}

impl AtmState {
    pub fn name(&self) -> &'static str {
        match self {
            AtmState::NoCard => "NoCard",
            AtmState::CardInserted => "CardInserted",
            AtmState::EnteringPin { .. } => "EnteringPin",
            AtmState::Authenticated => "Authenticated",
            AtmState::Withdrawal => "Withdrawal",
            AtmState::SessionEnding => "SessionEnding",
        }
    }
}

impl fmt::Display for AtmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the client loop should do after one `handle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Nobody is at the machine; return to the top menu
    Leave,
}

#[derive(Debug)]
pub struct AtmStateMachine {
    state: AtmState,
}

impl Default for AtmStateMachine {
    fn default() -> Self {
        AtmStateMachine {
            state: AtmState::NoCard,
        }
    }
}

impl AtmStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AtmState {
        self.state
    }

    /// Run the current state's logic once
    ///
    /// # Errors
    ///
    /// Errors are logged with the state name and returned; the caller
    /// decides how to recover.
    pub fn handle(&mut self, ctx: &mut AtmContext) -> Result<Control, AtmError> {
        let state = self.state;
        let result = match state {
            AtmState::NoCard => self.handle_no_card(ctx),
            AtmState::CardInserted => {
                let max = ctx.authenticator.max_attempts();
                self.change_state(ctx, AtmState::EnteringPin { attempts_left: max });
                Ok(Control::Continue)
            }
            AtmState::EnteringPin { attempts_left } => self.handle_entering_pin(ctx, attempts_left),
            AtmState::Authenticated => self.handle_authenticated(ctx),
            AtmState::Withdrawal => self.handle_withdrawal(ctx),
            AtmState::SessionEnding => self.handle_session_ending(ctx),
        };

        if let Err(e) = &result {
            error!(state = state.name(), error = %e, "State handler failed");
        }
        result
    }

    /// Move to `next`, running exit and enter hooks
    pub fn change_state(&mut self, ctx: &mut AtmContext, next: AtmState) {
        self.on_exit(ctx);
        let previous = std::mem::replace(&mut self.state, next);
        self.on_enter(ctx);
        info!(from = previous.name(), state = self.state.name(), "State changed");
    }

    /// Drop back to `NoCard` without running hooks
    pub fn reset(&mut self) {
        if self.state != AtmState::NoCard {
            warn!(from = self.state.name(), "State machine reset");
            self.state = AtmState::NoCard;
        }
    }

    /// Serve clients until nobody is at the machine
    pub fn run_client(&mut self, ctx: &mut AtmContext) -> Result<(), AtmError> {
        loop {
            if self.handle(ctx)? == Control::Leave {
                return Ok(());
            }
        }
    }

    fn on_enter(&mut self, ctx: &mut AtmContext) {
        match &mut self.state {
            AtmState::EnteringPin { attempts_left } => {
                if let Some(card) = ctx.reader.current() {
                    *attempts_left = ctx.authenticator.remaining_attempts(&card.number);
                }
            }
            AtmState::Authenticated => {
                if let Some(card) = ctx.reader.current() {
                    debug!(card = %card.number.masked(), "Main menu");
                }
            }
            _ => {}
        }
    }

    fn on_exit(&mut self, _ctx: &mut AtmContext) {
        debug!(state = self.state.name(), "Leaving state");
    }

    fn handle_no_card(&mut self, ctx: &mut AtmContext) -> Result<Control, AtmError> {
        let input = match ctx
            .prompter
            .ask_untimed("Insert card (card number, blank to return): ")
        {
            Prompt::Line(line) => line,
            Prompt::TimedOut | Prompt::Closed => return Ok(Control::Leave),
        };
        if input.is_empty() {
            return Ok(Control::Leave);
        }

        let number = match CardNumber::parse(&input) {
            Ok(number) => number,
            Err(e) => {
                ctx.sound.beep_error();
                ctx.prompter.message(&format!("Error: {}", e));
                return Ok(Control::Continue);
            }
        };

        let account = ctx.accounts.get_account(&number);
        let card = Card::new(
            number.clone(),
            account.as_ref().and_then(|a| a.owner_name.clone()),
            account.and_then(|a| a.expiry_date),
        );
        if let Err(e) = ctx.reader.insert(card) {
            warn!(error = %e, "Card insert refused");
            ctx.prompter.message(&format!("Error: {}", e));
            return Ok(Control::Continue);
        }
        if let Err(e) = ctx.session.start(SessionKind::Client, number.as_str()) {
            warn!(error = %e, "Client session refused");
            ctx.reader.eject();
            ctx.prompter.message(&format!("Error: {}", e));
            return Ok(Control::Continue);
        }

        self.change_state(ctx, AtmState::CardInserted);
        Ok(Control::Continue)
    }

    fn handle_entering_pin(
        &mut self,
        ctx: &mut AtmContext,
        attempts_left: u32,
    ) -> Result<Control, AtmError> {
        let card = current_card(ctx)?;
        let Some(pin) = self.ask_or_end(ctx, &format!("Enter PIN ({} attempts left): ", attempts_left))
        else {
            return Ok(Control::Continue);
        };

        match ctx.authenticator.authenticate(&card, &pin)? {
            AuthOutcome::Granted => {
                ctx.sound.beep_success();
                ctx.prompter.message("PIN accepted.");
                self.change_state(ctx, AtmState::Authenticated);
            }
            AuthOutcome::Rejected { attempts_left } => {
                self.state = AtmState::EnteringPin { attempts_left };
                ctx.sound.beep_error();
                ctx.prompter
                    .message(&format!("Wrong PIN. Attempts left: {}", attempts_left));
            }
            AuthOutcome::InvalidFormat => {
                ctx.sound.beep_error();
                ctx.prompter.message(&format!(
                    "PIN must be {} digits.",
                    ctx.authenticator.pin_length()
                ));
            }
            AuthOutcome::Locked | AuthOutcome::CardBlocked => {
                ctx.sound.beep_error();
                ctx.prompter.message(
                    "Your card is blocked and has been retained. Please contact your bank.",
                );
                self.retain_card(ctx)?;
            }
            AuthOutcome::UnknownCard => {
                ctx.sound.beep_error();
                ctx.prompter
                    .message("Card not recognised. Please take your card.");
                ctx.reader.eject();
                ctx.session.end();
                self.change_state(ctx, AtmState::NoCard);
            }
        }
        Ok(Control::Continue)
    }

    fn handle_authenticated(&mut self, ctx: &mut AtmContext) -> Result<Control, AtmError> {
        let card = current_card(ctx)?;
        let choice = match ctx.prompter.choose("Main menu", &MAIN_MENU) {
            Prompt::Line(choice) => choice,
            Prompt::TimedOut => {
                self.end_after_timeout(ctx);
                return Ok(Control::Continue);
            }
            Prompt::Closed => {
                self.change_state(ctx, AtmState::SessionEnding);
                return Ok(Control::Continue);
            }
        };

        match choice.as_str() {
            "1" => ctx.run_transaction(&card, &BalanceInquiry)?,
            "2" => self.change_state(ctx, AtmState::Withdrawal),
            "3" => self.deposit(ctx, &card)?,
            "4" => self.transfer(ctx, &card)?,
            "5" => self.payment(ctx, &card)?,
            "6" => self.change_pin(ctx, &card)?,
            "7" => self.change_state(ctx, AtmState::SessionEnding),
            _ => ctx.prompter.message("Invalid option."),
        }
        Ok(Control::Continue)
    }

    fn handle_withdrawal(&mut self, ctx: &mut AtmContext) -> Result<Control, AtmError> {
        let card = current_card(ctx)?;
        let prompt = format!(
            "Enter amount (multiple of {}): ",
            ctx.config.withdrawal_unit
        );
        let Some(input) = self.ask_or_end(ctx, &prompt) else {
            return Ok(Control::Continue);
        };

        match parse_cash_amount(&input) {
            Ok(amount) => ctx.run_transaction(&card, &WithdrawalTransaction::new(amount))?,
            Err(e) => {
                ctx.sound.beep_error();
                ctx.prompter.message(&format!("Error: {}", e));
            }
        }
        self.change_state(ctx, AtmState::Authenticated);
        Ok(Control::Continue)
    }

    fn handle_session_ending(&mut self, ctx: &mut AtmContext) -> Result<Control, AtmError> {
        ctx.prompter
            .message("Thank you for using our ATM. Please take your card.");
        ctx.reader.eject();
        ctx.session.end();
        self.change_state(ctx, AtmState::NoCard);
        Ok(Control::Continue)
    }

    fn deposit(&mut self, ctx: &mut AtmContext, card: &CardNumber) -> Result<(), AtmError> {
        let Some(input) =
            self.ask_or_end(ctx, "Insert notes as denom:count pairs (e.g. 100:3 50:2): ")
        else {
            return Ok(());
        };
        match parse_notes(&input) {
            Ok(notes) => ctx.run_transaction(card, &DepositTransaction::new(notes)),
            Err(e) => {
                report(ctx, &e);
                Ok(())
            }
        }
    }

    fn transfer(&mut self, ctx: &mut AtmContext, card: &CardNumber) -> Result<(), AtmError> {
        let Some(input) = self.ask_or_end(ctx, "Recipient card number: ") else {
            return Ok(());
        };
        let to = match CardNumber::parse(&input) {
            Ok(to) => to,
            Err(e) => {
                report(ctx, &e);
                return Ok(());
            }
        };
        let Some(input) = self.ask_or_end(ctx, "Amount: ") else {
            return Ok(());
        };
        match parse_money(&input) {
            Ok(amount) => ctx.run_transaction(card, &TransferTransaction { to, amount }),
            Err(e) => {
                report(ctx, &e);
                Ok(())
            }
        }
    }

    fn payment(&mut self, ctx: &mut AtmContext, card: &CardNumber) -> Result<(), AtmError> {
        let Some(service) = self.ask_or_end(ctx, "Service name: ") else {
            return Ok(());
        };
        let Some(input) = self.ask_or_end(ctx, "Amount: ") else {
            return Ok(());
        };
        match parse_money(&input) {
            Ok(amount) => ctx.run_transaction(card, &PaymentTransaction { service, amount }),
            Err(e) => {
                report(ctx, &e);
                Ok(())
            }
        }
    }

    fn change_pin(&mut self, ctx: &mut AtmContext, card: &CardNumber) -> Result<(), AtmError> {
        let Some(current_pin) = self.ask_or_end(ctx, "Current PIN: ") else {
            return Ok(());
        };
        let Some(new_pin) = self.ask_or_end(ctx, "New PIN: ") else {
            return Ok(());
        };
        let Some(confirm_pin) = self.ask_or_end(ctx, "Confirm new PIN: ") else {
            return Ok(());
        };
        ctx.run_transaction(
            card,
            &PinChangeTransaction {
                current_pin,
                new_pin,
                confirm_pin,
            },
        )
    }

    /// Ask a timed question; on timeout or closed input move to
    /// `SessionEnding` and return `None`
    fn ask_or_end(&mut self, ctx: &mut AtmContext, prompt: &str) -> Option<String> {
        match ctx.prompter.ask(prompt) {
            Prompt::Line(line) => Some(line),
            Prompt::TimedOut => {
                self.end_after_timeout(ctx);
                None
            }
            Prompt::Closed => {
                self.change_state(ctx, AtmState::SessionEnding);
                None
            }
        }
    }

    fn end_after_timeout(&mut self, ctx: &mut AtmContext) {
        ctx.prompter.message("Session timed out due to inactivity.");
        self.change_state(ctx, AtmState::SessionEnding);
    }

    /// Flag the card retained, swallow it, and close the session
    ///
    /// The flag is saved first. If that fails the card stays in the reader
    /// and the error propagates, so the bin never holds a card the store
    /// does not know is retained.
    fn retain_card(&mut self, ctx: &mut AtmContext) -> Result<(), AtmError> {
        let card = current_card(ctx)?;
        ctx.accounts.set_retained(&card, true)?;
        ctx.reader.retain_into(&mut ctx.retainer)?;
        ctx.session.end();
        self.change_state(ctx, AtmState::NoCard);
        Ok(())
    }
}

fn current_card(ctx: &AtmContext) -> Result<CardNumber, AtmError> {
    ctx.reader
        .current()
        .map(|card| card.number.clone())
        .ok_or_else(|| AtmError::internal("no card in reader during client session"))
}

fn report(ctx: &mut AtmContext, error: &AtmError) {
    ctx.sound.beep_error();
    ctx.prompter.message(&format!("Error: {}", error));
}
