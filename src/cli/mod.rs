// CLI module
// Command-line interface, argument parsing, and logging setup

mod args;
mod logging;

pub use args::CliArgs;
pub use logging::init_logging;

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (e.g., invalid values or the --help flag), clap
/// displays an error message or help text and exits the process.
///
/// # Returns
///
/// Returns a `CliArgs` struct with the parsed command-line arguments.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
