use crate::types::AtmError;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
///
/// Logs go to stderr, and also to `log_file` when given. The level is
/// `info`, or `debug` with `verbose`; `RUST_LOG` overrides both.
///
/// # Errors
///
/// Returns [`AtmError::Storage`] if the log file cannot be opened, and
/// [`AtmError::Internal`] if a subscriber is already installed.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<(), AtmError> {
    let filter = if verbose { "debug" } else { "info" };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| AtmError::internal(format!("logging already initialised: {}", e)))
}
