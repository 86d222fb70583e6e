//! Top-level loop of the machine
//!
//! `Atm` owns the context and the client state machine and routes each
//! visitor into a client or operator session. A fatal error in one session
//! never stops the machine: the session is torn down and the menu returns.

use crate::core::context::AtmContext;
use crate::core::operator::run_operator_session;
use crate::core::state_machine::{AtmState, AtmStateMachine};
use crate::core::timer::Prompt;
use crate::types::{AtmError, SessionKind};
use tracing::{error, info};

const TOP_MENU: [&str; 4] = ["Client", "Cash replenisher", "Technician", "Exit"];

pub struct Atm {
    ctx: AtmContext,
    machine: AtmStateMachine,
}

impl Atm {
    pub fn new(ctx: AtmContext) -> Self {
        Atm {
            ctx,
            machine: AtmStateMachine::new(),
        }
    }

    pub fn context(&self) -> &AtmContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut AtmContext {
        &mut self.ctx
    }

    /// Current client state
    pub fn state(&self) -> AtmState {
        self.machine.state()
    }

    /// Serve sessions until Exit is chosen or input closes
    ///
    /// The top menu is untimed. Errors from a session are logged and the
    /// session is aborted; they are not returned.
    pub fn run(&mut self) {
        info!("ATM started");
        loop {
            self.ctx.prompter.menu("ATM", &TOP_MENU);
            let choice = match self.ctx.prompter.ask_untimed("Select option: ") {
                Prompt::Line(line) => line,
                Prompt::TimedOut | Prompt::Closed => break,
            };

            let result = match choice.as_str() {
                "1" => self.machine.run_client(&mut self.ctx),
                "2" => run_operator_session(&mut self.ctx, SessionKind::CashReplenisher),
                "3" => run_operator_session(&mut self.ctx, SessionKind::Technician),
                "4" => break,
                _ => {
                    self.ctx.prompter.message("Invalid option.");
                    continue;
                }
            };

            if let Err(e) = result {
                self.recover(&e);
            }
        }
        info!("ATM stopped");
    }

    fn recover(&mut self, e: &AtmError) {
        error!(error = %e, state = self.machine.state().name(), "Session aborted");
        self.ctx.sound.beep_error();
        self.ctx
            .prompter
            .message("Technical error. The session has been ended. Please take your card.");
        self.ctx.abort_session();
        self.machine.reset();
    }
}
