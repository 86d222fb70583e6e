//! Console terminal
//!
//! Renders to stdout and reads stdin lines. Stdin has no portable
//! non-blocking read, so the lines are pulled through a single-threaded
//! tokio runtime: each poll is a `tokio::time::timeout` around
//! `Lines::next_line`, which is cancel-safe, so an abandoned wait never
//! loses a partially read line.

use crate::core::traits::{LineRead, Terminal};
use crate::types::AtmError;
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::runtime::Runtime;
use tracing::error;

pub struct ConsoleTerminal {
    runtime: Runtime,
    lines: Lines<BufReader<Stdin>>,
}

impl ConsoleTerminal {
    /// Attach to the process stdin and stdout
    ///
    /// # Errors
    ///
    /// Returns an error if the tokio runtime cannot be created.
    pub fn new() -> Result<Self, AtmError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| AtmError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        // Stdin must be created inside the runtime context
        let lines = {
            let _guard = runtime.enter();
            BufReader::new(tokio::io::stdin()).lines()
        };

        Ok(ConsoleTerminal { runtime, lines })
    }

    fn write(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout is not worth failing the session over
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl Terminal for ConsoleTerminal {
    fn show_message(&mut self, text: &str) {
        self.write(&format!("{}\n", text));
    }

    fn show_menu(&mut self, title: &str, options: &[&str]) {
        let mut menu = format!("\n=== {} ===\n", title);
        for (index, option) in options.iter().enumerate() {
            menu.push_str(&format!("{}. {}\n", index + 1, option));
        }
        self.write(&menu);
    }

    fn show_prompt(&mut self, prompt: &str) {
        self.write(prompt);
    }

    fn poll_line(&mut self, wait: Duration) -> LineRead {
        let lines = &mut self.lines;
        let read = self
            .runtime
            .block_on(async { tokio::time::timeout(wait, lines.next_line()).await });

        match read {
            Ok(Ok(Some(line))) => LineRead::Line(line),
            Ok(Ok(None)) => LineRead::Closed,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to read stdin");
                LineRead::Closed
            }
            Err(_elapsed) => LineRead::Pending,
        }
    }
}
