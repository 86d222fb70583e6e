//! JSON file repository
//!
//! Two documents live in the data directory:
//!
//! - the accounts document, a JSON object keyed by card number whose values
//!   are serialized [`Account`]s
//! - the machine state document, a JSON object whose `cash_inventory` key
//!   maps denomination strings to note counts
//!
//! Writes go to a sibling temporary file that is then renamed over the
//! target, so a crash never leaves a half-written document behind.

use crate::core::traits::{AccountRepository, InventoryRepository};
use crate::types::{Account, AtmError, Denomination, Notes};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key of the inventory inside the state document
const CASH_INVENTORY_KEY: &str = "cash_inventory";

/// Repository backed by two JSON documents
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    accounts_path: PathBuf,
    state_path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(accounts_path: impl Into<PathBuf>, state_path: impl Into<PathBuf>) -> Self {
        JsonFileRepository {
            accounts_path: accounts_path.into(),
            state_path: state_path.into(),
        }
    }

    pub fn accounts_path(&self) -> &Path {
        &self.accounts_path
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

impl AccountRepository for JsonFileRepository {
    /// Read the accounts document
    ///
    /// A missing file yields no accounts. Entries that do not describe a
    /// valid account, or whose key differs from their card number, are
    /// skipped with a warning.
    fn load_accounts(&self) -> Result<Vec<Account>, AtmError> {
        let Some(document) = read_object(&self.accounts_path)? else {
            return Ok(Vec::new());
        };

        let mut accounts = Vec::with_capacity(document.len());
        for (key, value) in document {
            match serde_json::from_value::<Account>(value) {
                Ok(account) if account.card_number.as_str() == key => accounts.push(account),
                Ok(_) => warn!(key = %key, "Skipping account stored under a different key"),
                Err(e) => warn!(key = %key, error = %e, "Skipping malformed account"),
            }
        }
        debug!(count = accounts.len(), path = %self.accounts_path.display(), "Accounts loaded");
        Ok(accounts)
    }

    fn save_accounts(&self, accounts: &[Account]) -> Result<(), AtmError> {
        let document: BTreeMap<&str, &Account> = accounts
            .iter()
            .map(|account| (account.card_number.as_str(), account))
            .collect();
        write_json(&self.accounts_path, &serde_json::to_value(document)?)
    }
}

impl InventoryRepository for JsonFileRepository {
    /// Read `cash_inventory` from the state document
    ///
    /// Returns `None` if the file or the key is missing. Keys that are not
    /// denominations are ignored; negative counts read as zero.
    fn load_inventory(&self) -> Result<Option<Notes>, AtmError> {
        let Some(document) = read_object(&self.state_path)? else {
            return Ok(None);
        };
        let Some(inventory) = document.get(CASH_INVENTORY_KEY) else {
            return Ok(None);
        };
        let Value::Object(inventory) = inventory else {
            return Err(AtmError::storage(format!(
                "{} in {} is not an object",
                CASH_INVENTORY_KEY,
                self.state_path.display()
            )));
        };

        let mut notes = Notes::new();
        for (key, value) in inventory {
            let Ok(denomination) = key.trim().parse::<Denomination>() else {
                warn!(key = %key, "Ignoring unknown denomination in state file");
                continue;
            };
            let Some(count) = value.as_i64() else {
                warn!(key = %key, "Ignoring non-numeric note count in state file");
                continue;
            };
            let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
            notes.insert(denomination, count);
        }
        Ok(Some(notes))
    }

    /// Write `cash_inventory`, keeping every other key of the document
    fn save_inventory(&self, notes: &Notes) -> Result<(), AtmError> {
        let mut document = match read_object(&self.state_path) {
            Ok(Some(document)) => document,
            Ok(None) => Map::new(),
            Err(e) => {
                warn!(error = %e, "Replacing unreadable state file");
                Map::new()
            }
        };

        let inventory: Map<String, Value> = notes
            .iter()
            .map(|(denom, count)| (denom.to_string(), Value::from(*count)))
            .collect();
        document.insert(CASH_INVENTORY_KEY.to_string(), Value::Object(inventory));

        write_json(&self.state_path, &Value::Object(document))
    }
}

/// Read a JSON object document; `None` if the file does not exist
fn read_object(path: &Path) -> Result<Option<Map<String, Value>>, AtmError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if contents.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str(&contents)? {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(AtmError::storage(format!(
            "{} does not hold a JSON object",
            path.display()
        ))),
    }
}

/// Pretty-print `value` to `path` through a temporary sibling file
fn write_json(path: &Path, value: &Value) -> Result<(), AtmError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&temp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountRole, CardNumber};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn repository(dir: &TempDir) -> JsonFileRepository {
        JsonFileRepository::new(
            dir.path().join("bank_accounts.json"),
            dir.path().join("atm_state.json"),
        )
    }

    fn card(number: &str) -> CardNumber {
        CardNumber::parse(number).unwrap()
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        assert!(repository.load_accounts().unwrap().is_empty());
        assert_eq!(repository.load_inventory().unwrap(), None);
    }

    #[test]
    fn test_accounts_are_keyed_by_card_number() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        let account = Account::new(card("1234567890123456"), "0000", dec!(10000.50))
            .unwrap()
            .with_owner("Ivan Ivanov")
            .with_expiry("12/28");
        repository.save_accounts(std::slice::from_ref(&account)).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(repository.accounts_path()).unwrap()).unwrap();
        assert_eq!(raw["1234567890123456"]["balance"], Value::from("10000.50"));
        assert_eq!(raw["1234567890123456"]["role"], Value::from("client"));

        assert_eq!(repository.load_accounts().unwrap(), vec![account]);
    }

    #[test]
    fn test_malformed_account_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        let good = Account::new(card("1111111111111111"), "1234", dec!(5)).unwrap();
        let mut document = Map::new();
        document.insert(
            "1111111111111111".to_string(),
            serde_json::to_value(&good).unwrap(),
        );
        document.insert("2222222222222222".to_string(), Value::from("garbage"));
        document.insert(
            "3333333333333333".to_string(),
            serde_json::to_value(&good).unwrap(),
        );
        fs::write(
            repository.accounts_path(),
            Value::Object(document).to_string(),
        )
        .unwrap();

        assert_eq!(repository.load_accounts().unwrap(), vec![good]);
    }

    #[test]
    fn test_role_defaults_to_client() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        let account = Account::new(card("1000000000000002"), "2222", dec!(0))
            .unwrap()
            .with_role(AccountRole::Technician);
        let mut value = serde_json::to_value(&account).unwrap();
        value.as_object_mut().unwrap().remove("role");
        fs::write(
            repository.accounts_path(),
            serde_json::json!({ "1000000000000002": value }).to_string(),
        )
        .unwrap();

        let loaded = repository.load_accounts().unwrap();
        assert_eq!(loaded[0].role, AccountRole::Client);
    }

    #[test]
    fn test_malformed_document_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        fs::write(repository.accounts_path(), "[1, 2").unwrap();
        assert!(matches!(
            repository.load_accounts(),
            Err(AtmError::Storage { .. })
        ));
    }

    #[test]
    fn test_inventory_save_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        fs::write(
            repository.state_path(),
            r#"{"machine_id": "ATM-7", "cash_inventory": {"100": 1}}"#,
        )
        .unwrap();

        let notes: Notes = [(100, 3), (50, 2)].into_iter().collect();
        repository.save_inventory(&notes).unwrap();

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(repository.state_path()).unwrap()).unwrap();
        assert_eq!(raw["machine_id"], Value::from("ATM-7"));
        assert_eq!(raw["cash_inventory"]["100"], Value::from(3));
        assert_eq!(repository.load_inventory().unwrap(), Some(notes));
    }

    #[test]
    fn test_inventory_load_ignores_junk_and_clamps() {
        let dir = TempDir::new().unwrap();
        let repository = repository(&dir);
        fs::write(
            repository.state_path(),
            r#"{"cash_inventory": {"100": -4, "fifty": 3, "200": "x", "500": 7}}"#,
        )
        .unwrap();

        let expected: Notes = [(100, 0), (500, 7)].into_iter().collect();
        assert_eq!(repository.load_inventory().unwrap(), Some(expected));
    }
}
