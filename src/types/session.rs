//! Session-related types

use super::account::AccountRole;
use std::fmt;

/// Who is operating the machine
///
/// The kind decides which action loop governs the session and what an
/// inactivity timeout does to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Cardholder session driven by the state machine
    Client,
    /// Cash replenisher (incassator) session
    CashReplenisher,
    /// Technician session
    Technician,
}

impl SessionKind {
    /// Account role required to open a session of this kind
    pub fn required_role(&self) -> Option<AccountRole> {
        match self {
            SessionKind::Client => None,
            SessionKind::CashReplenisher => Some(AccountRole::CashReplenisher),
            SessionKind::Technician => Some(AccountRole::Technician),
        }
    }

    pub fn is_operator(&self) -> bool {
        !matches!(self, SessionKind::Client)
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Client => "client",
            SessionKind::CashReplenisher => "cash replenisher",
            SessionKind::Technician => "technician",
        };
        f.write_str(name)
    }
}
