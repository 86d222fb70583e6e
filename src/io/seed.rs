//! Demo accounts
//!
//! Installed when the accounts document is missing or empty so a fresh
//! machine can be tried out straight away.

use crate::types::{Account, AccountRole, AtmError, CardNumber};
use rust_decimal::Decimal;

const DEMO_EXPIRY: &str = "12/28";

/// Demo accounts: two clients, one blocked card, and one card per operator
/// role
///
/// | card | PIN | balance | note |
/// |---|---|---|---|
/// | 1234567890123456 | 0000 | 10000 | client |
/// | 1111111111111111 | 1234 | 5000 | client |
/// | 9999999999999999 | 0000 | 0 | blocked |
/// | 1000000000000001 | 1111 | 0 | cash replenisher |
/// | 1000000000000002 | 2222 | 0 | technician |
pub fn demo_accounts() -> Result<Vec<Account>, AtmError> {
    let accounts = vec![
        demo("1234567890123456", "0000", 10_000, "Ivan Ivanov")?,
        demo("1111111111111111", "1234", 5_000, "Petr Petrov")?,
        demo("9999999999999999", "0000", 0, "Blocked Card")?.with_blocked(true),
        demo("1000000000000001", "1111", 0, "Cash Replenisher")?
            .with_role(AccountRole::CashReplenisher),
        demo("1000000000000002", "2222", 0, "Service Technician")?
            .with_role(AccountRole::Technician),
    ];
    Ok(accounts)
}

fn demo(card: &str, pin: &str, balance: i64, owner: &str) -> Result<Account, AtmError> {
    let account = Account::new(CardNumber::parse(card)?, pin, Decimal::from(balance))?
        .with_owner(owner)
        .with_expiry(DEMO_EXPIRY);
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_demo_accounts() {
        let accounts = demo_accounts().unwrap();
        assert_eq!(accounts.len(), 5);

        let first = &accounts[0];
        assert!(first.verify_pin("0000"));
        assert_eq!(first.balance, dec!(10000));
        assert_eq!(first.expiry_date.as_deref(), Some("12/28"));

        let blocked = accounts
            .iter()
            .find(|a| a.card_number.as_str() == "9999999999999999")
            .unwrap();
        assert!(blocked.is_blocked);

        let roles: Vec<AccountRole> = accounts.iter().map(|a| a.role).collect();
        assert!(roles.contains(&AccountRole::CashReplenisher));
        assert!(roles.contains(&AccountRole::Technician));
    }
}
