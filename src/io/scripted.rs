//! Scripted terminal
//!
//! Replays a fixed sequence of input lines and silences, and records
//! everything shown. Used by tests and for replaying demo sessions.

use crate::core::traits::{LineRead, Terminal};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One step of scripted input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// A line typed by the user
    Line(String),
    /// No input for this long
    Silence(Duration),
}

impl ScriptStep {
    pub fn line(text: impl Into<String>) -> Self {
        ScriptStep::Line(text.into())
    }

    pub fn silence_ms(millis: u64) -> Self {
        ScriptStep::Silence(Duration::from_millis(millis))
    }
}

/// Shared record of terminal output
///
/// Cloning yields another handle to the same record, so a test can keep one
/// after handing the terminal to the machine.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Transcript {
    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }

    /// Every shown line, in order
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Whether any shown line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    /// Number of shown lines containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.lines().iter().filter(|line| line.contains(needle)).count()
    }
}

/// Terminal fed from a script
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    steps: VecDeque<ScriptStep>,
    transcript: Transcript,
}

impl ScriptedTerminal {
    /// Terminal that types `lines` one after another
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_steps(lines.into_iter().map(ScriptStep::line).collect())
    }

    pub fn from_steps(steps: Vec<ScriptStep>) -> Self {
        ScriptedTerminal {
            steps: steps.into(),
            transcript: Transcript::default(),
        }
    }

    /// Handle to the output record
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

impl Terminal for ScriptedTerminal {
    fn show_message(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }

    fn show_menu(&mut self, title: &str, options: &[&str]) {
        self.transcript.push(format!("=== {} ===", title));
        for (index, option) in options.iter().enumerate() {
            self.transcript.push(format!("{}. {}", index + 1, option));
        }
    }

    fn show_prompt(&mut self, prompt: &str) {
        self.transcript.push(prompt.to_string());
    }

    fn poll_line(&mut self, wait: Duration) -> LineRead {
        match self.steps.pop_front() {
            Some(ScriptStep::Line(line)) => LineRead::Line(line),
            Some(ScriptStep::Silence(left)) => {
                let slept = left.min(wait);
                std::thread::sleep(slept);
                let left = left.saturating_sub(slept);
                if !left.is_zero() {
                    self.steps.push_front(ScriptStep::Silence(left));
                }
                LineRead::Pending
            }
            None => LineRead::Closed,
        }
    }
}
