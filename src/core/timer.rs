//! Inactivity timer and timed prompts
//!
//! # Overview
//!
//! Waiting for input is the only place a session can stall, so it is the
//! only place the inactivity deadline is evaluated. [`Prompter`] wraps a
//! [`Terminal`] and turns every timed question into a poll loop:
//!
//! 1. Issuing a prompt re-arms the [`InactivityTimer`].
//! 2. The terminal is polled in short slices, never past the deadline.
//! 3. A line resets the timer before it is handed back.
//! 4. Once the deadline passes the wait is abandoned and
//!    [`Prompt::TimedOut`] is returned.
//!
//! A timeout is a value, not an error. The caller decides what it means: a
//! client session moves to `SessionEnding`, an operator session just ends.

use crate::core::traits::{LineRead, Terminal};
use std::time::{Duration, Instant};
use tracing::warn;

/// Longest single wait handed to the terminal
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Answer to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Trimmed input line
    Line(String),
    /// No input before the inactivity deadline
    TimedOut,
    /// Input closed
    Closed,
}

/// Wall-clock watchdog for user activity
#[derive(Debug, Clone)]
pub struct InactivityTimer {
    timeout: Duration,
    last_activity: Instant,
    fired: bool,
}

impl InactivityTimer {
    pub fn new(timeout: Duration) -> Self {
        InactivityTimer {
            timeout,
            last_activity: Instant::now(),
            fired: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record activity now
    pub fn reset(&mut self) {
        self.last_activity = Instant::now();
        self.fired = false;
    }

    pub fn elapsed(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed() >= self.timeout
    }

    /// Run `on_timeout` if the deadline has passed
    ///
    /// The callback runs at most once per arming; call [`reset`](Self::reset)
    /// to arm again. Returns whether the timer is expired.
    pub fn check_timeout<F: FnOnce()>(&mut self, on_timeout: F) -> bool {
        if !self.is_expired() {
            return false;
        }
        if !self.fired {
            self.fired = true;
            on_timeout();
        }
        true
    }
}

/// Terminal wrapper that enforces the inactivity deadline on input
pub struct Prompter {
    terminal: Box<dyn Terminal>,
    timer: InactivityTimer,
}

impl Prompter {
    pub fn new(terminal: Box<dyn Terminal>, timeout: Duration) -> Self {
        Prompter {
            terminal,
            timer: InactivityTimer::new(timeout),
        }
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    pub fn message(&mut self, text: &str) {
        self.terminal.show_message(text);
    }

    pub fn menu(&mut self, title: &str, options: &[&str]) {
        self.terminal.show_menu(title, options);
    }

    /// Ask a question and wait for the answer, bounded by the timeout
    pub fn ask(&mut self, prompt: &str) -> Prompt {
        self.terminal.show_prompt(prompt);
        self.timer.reset();
        let timeout = self.timer.timeout();

        loop {
            if self
                .timer
                .check_timeout(|| warn!(?timeout, "Inactivity timeout"))
            {
                return Prompt::TimedOut;
            }
            let wait = self.timer.remaining().min(POLL_INTERVAL);
            match self.terminal.poll_line(wait) {
                LineRead::Line(line) => {
                    self.timer.reset();
                    return Prompt::Line(line.trim().to_string());
                }
                LineRead::Pending => continue,
                LineRead::Closed => return Prompt::Closed,
            }
        }
    }

    /// Show a numbered menu and wait for a choice, bounded by the timeout
    pub fn choose(&mut self, title: &str, options: &[&str]) -> Prompt {
        self.terminal.show_menu(title, options);
        self.ask("Select option: ")
    }

    /// Ask a question and wait with no deadline
    ///
    /// Used where nobody is being served yet: the card slot and the top
    /// menu.
    pub fn ask_untimed(&mut self, prompt: &str) -> Prompt {
        self.terminal.show_prompt(prompt);
        loop {
            match self.terminal.poll_line(POLL_INTERVAL) {
                LineRead::Line(line) => {
                    self.timer.reset();
                    return Prompt::Line(line.trim().to_string());
                }
                LineRead::Pending => continue,
                LineRead::Closed => return Prompt::Closed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ScriptStep, ScriptedTerminal};

    #[test]
    fn test_timer_expiry_and_reset() {
        let mut timer = InactivityTimer::new(Duration::from_millis(20));
        assert!(!timer.is_expired());
        assert!(timer.remaining() <= Duration::from_millis(20));

        std::thread::sleep(Duration::from_millis(30));
        assert!(timer.is_expired());
        assert_eq!(timer.remaining(), Duration::ZERO);

        timer.reset();
        assert!(!timer.is_expired());
    }

    #[test]
    fn test_check_timeout_fires_once_per_arming() {
        let mut timer = InactivityTimer::new(Duration::ZERO);
        let mut fired = 0;

        assert!(timer.check_timeout(|| fired += 1));
        assert!(timer.check_timeout(|| fired += 1));
        assert_eq!(fired, 1);

        timer.reset();
        assert!(timer.check_timeout(|| fired += 1));
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_ask_returns_trimmed_line() {
        let terminal = ScriptedTerminal::new(["  42 "]);
        let transcript = terminal.transcript();
        let mut prompter = Prompter::new(Box::new(terminal), Duration::from_secs(5));

        assert_eq!(prompter.ask("Amount: "), Prompt::Line("42".to_string()));
        assert!(transcript.contains("Amount: "));
    }

    #[test]
    fn test_ask_times_out_on_silence() {
        let terminal = ScriptedTerminal::from_steps(vec![
            ScriptStep::silence_ms(40),
            ScriptStep::line("late"),
        ]);
        let mut prompter = Prompter::new(Box::new(terminal), Duration::from_millis(30));

        assert_eq!(prompter.ask("PIN: "), Prompt::TimedOut);
        // The abandoned wait does not swallow the next line
        assert_eq!(prompter.ask("PIN: "), Prompt::Line("late".to_string()));
    }

    #[test]
    fn test_closed_input() {
        let terminal = ScriptedTerminal::new(Vec::<String>::new());
        let mut prompter = Prompter::new(Box::new(terminal), Duration::from_secs(5));
        assert_eq!(prompter.ask("PIN: "), Prompt::Closed);
        assert_eq!(prompter.ask_untimed("Card: "), Prompt::Closed);
    }

    #[test]
    fn test_untimed_ask_ignores_deadline() {
        let terminal = ScriptedTerminal::from_steps(vec![
            ScriptStep::silence_ms(20),
            ScriptStep::line("1"),
        ]);
        let mut prompter = Prompter::new(Box::new(terminal), Duration::from_millis(1));
        assert_eq!(prompter.ask_untimed("Choice: "), Prompt::Line("1".to_string()));
    }
}
