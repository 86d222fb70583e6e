//! Active session slot
//!
//! The machine serves one actor at a time. `Session` is that single slot:
//! starting while occupied fails, ending while empty does nothing.

use crate::types::{AtmError, SessionKind};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Details of the session currently running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub kind: SessionKind,
    /// Card number of the client or operator
    pub actor_id: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Session {
    current: Option<ActiveSession>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `actor_id`
    ///
    /// # Errors
    ///
    /// Returns [`AtmError::SessionAlreadyActive`] if a session is running.
    pub fn start(&mut self, kind: SessionKind, actor_id: impl Into<String>) -> Result<(), AtmError> {
        if self.current.is_some() {
            return Err(AtmError::SessionAlreadyActive);
        }
        let session = ActiveSession {
            kind,
            actor_id: actor_id.into(),
            started_at: Utc::now(),
        };
        info!(%kind, "Session started");
        self.current = Some(session);
        Ok(())
    }

    /// Close the running session, if any
    ///
    /// Returns the session that was closed. Calling this with no active
    /// session is a no-op.
    pub fn end(&mut self) -> Option<ActiveSession> {
        let Some(session) = self.current.take() else {
            debug!("End requested with no active session");
            return None;
        };
        let duration = Utc::now().signed_duration_since(session.started_at);
        info!(
            kind = %session.kind,
            seconds = duration.num_seconds(),
            "Session ended"
        );
        Some(session)
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&ActiveSession> {
        self.current.as_ref()
    }

    pub fn kind(&self) -> Option<SessionKind> {
        self.current.as_ref().map(|session| session.kind)
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.current.as_ref().map(|session| session.actor_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_end() {
        let mut session = Session::new();
        session.start(SessionKind::Client, "1234567890123456").unwrap();

        assert!(session.is_active());
        assert_eq!(session.kind(), Some(SessionKind::Client));
        assert_eq!(session.actor_id(), Some("1234567890123456"));

        let ended = session.end().unwrap();
        assert_eq!(ended.kind, SessionKind::Client);
        assert!(!session.is_active());
    }

    #[test]
    fn test_second_start_fails() {
        let mut session = Session::new();
        session.start(SessionKind::Technician, "1000000000000002").unwrap();
        assert_eq!(
            session.start(SessionKind::Client, "1234567890123456"),
            Err(AtmError::SessionAlreadyActive)
        );
        assert_eq!(session.kind(), Some(SessionKind::Technician));
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut session = Session::new();
        assert!(session.end().is_none());

        session.start(SessionKind::CashReplenisher, "1000000000000001").unwrap();
        assert!(session.end().is_some());
        assert!(session.end().is_none());
        assert!(!session.is_active());
    }
}
