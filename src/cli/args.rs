use crate::types::AtmConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Run an interactive ATM session core on the console
#[derive(Parser, Debug)]
#[command(name = "rust-atm-engine")]
#[command(about = "Interactive ATM with client and operator sessions", long_about = None)]
pub struct CliArgs {
    /// Directory holding bank_accounts.json, atm_state.json, and receipts.csv
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        default_value = "data",
        help = "Directory for account, machine state, and receipt files"
    )]
    pub data_dir: PathBuf,

    /// Inactivity timeout in seconds
    #[arg(
        long = "timeout-secs",
        value_name = "SECS",
        help = "Inactivity timeout for timed prompts (default: 60)"
    )]
    pub timeout_secs: Option<u64>,

    /// Wrong PINs allowed before a card is blocked
    #[arg(
        long = "max-pin-attempts",
        value_name = "COUNT",
        help = "Wrong PIN attempts before the card is blocked (default: 3)"
    )]
    pub max_pin_attempts: Option<u32>,

    /// Also write logs to this file
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not create demo accounts when the accounts file is empty
    #[arg(long = "no-seed")]
    pub no_seed: bool,
}

impl CliArgs {
    /// Create an AtmConfig from CLI arguments
    ///
    /// Options that were not given keep their defaults. Zero values fall
    /// back to the defaults with a warning.
    ///
    /// # Returns
    ///
    /// An `AtmConfig` with values from CLI arguments or defaults.
    pub fn to_config(&self) -> AtmConfig {
        let default = AtmConfig::default();
        let timeout = self
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(default.session_timeout);
        let config = AtmConfig::new(
            self.data_dir.clone(),
            timeout,
            self.max_pin_attempts.unwrap_or(default.max_pin_attempts),
        );
        AtmConfig {
            seed_demo_accounts: !self.no_seed,
            ..config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::timeout(&["program", "--timeout-secs", "30"], Some(30), None)]
    #[case::attempts(&["program", "--max-pin-attempts", "5"], None, Some(5))]
    #[case::no_options(&["program"], None, None)]
    #[case::all_options(
        &["program", "--timeout-secs", "30", "--max-pin-attempts", "5"],
        Some(30),
        Some(5)
    )]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] timeout: Option<u64>,
        #[case] attempts: Option<u32>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.timeout_secs, timeout);
        assert_eq!(parsed.max_pin_attempts, attempts);
    }

    #[rstest]
    #[case::all_defaults(&["program"], 60, 3)]
    #[case::custom_timeout(&["program", "--timeout-secs", "15"], 15, 3)]
    #[case::custom_attempts(&["program", "--max-pin-attempts", "5"], 60, 5)]
    #[case::zero_timeout(&["program", "--timeout-secs", "0"], 60, 3)]
    #[case::zero_attempts(&["program", "--max-pin-attempts", "0"], 60, 3)]
    fn test_config_conversion(
        #[case] args: &[&str],
        #[case] expected_timeout: u64,
        #[case] expected_attempts: u32,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_config();

        assert_eq!(config.session_timeout, Duration::from_secs(expected_timeout));
        assert_eq!(config.max_pin_attempts, expected_attempts);
    }

    #[test]
    fn test_paths_and_flags() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--data-dir",
            "/tmp/atm",
            "--log-file",
            "/tmp/atm.log",
            "--verbose",
            "--no-seed",
        ])
        .unwrap();
        assert!(parsed.verbose);
        assert_eq!(parsed.log_file, Some(PathBuf::from("/tmp/atm.log")));

        let config = parsed.to_config();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/atm"));
        assert!(!config.seed_demo_accounts);
        assert_eq!(config.accounts_file(), PathBuf::from("/tmp/atm/bank_accounts.json"));
    }

    #[rstest]
    #[case::negative_timeout(&["program", "--timeout-secs", "-1"])]
    #[case::text_attempts(&["program", "--max-pin-attempts", "many"])]
    #[case::unexpected_positional(&["program", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
