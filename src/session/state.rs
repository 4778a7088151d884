use std::fmt;

use serde::Serialize;

use super::schedule::ScheduledTask;
use super::transport::AccountInfo;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    /// Waiting for the pairing code to be scanned
    PairingPending,
    Authenticating,
    Ready,
    Disconnected,
    /// A reconnect is scheduled
    ReconnectPending,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::PairingPending => "pairing_pending",
            SessionState::Authenticating => "authenticating",
            SessionState::Ready => "ready",
            SessionState::Disconnected => "disconnected",
            SessionState::ReconnectPending => "reconnect_pending",
        }
    }

    pub fn is_ready(&self) -> bool {
        *self == SessionState::Ready
    }

    /// Numeric value exported as a gauge
    pub fn as_metric(&self) -> i64 {
        match self {
            SessionState::Idle => 0,
            SessionState::Connecting => 1,
            SessionState::PairingPending => 2,
            SessionState::Authenticating => 3,
            SessionState::Ready => 4,
            SessionState::Disconnected => 5,
            SessionState::ReconnectPending => 6,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide session, owned exclusively by the manager task.
///
/// Invariants: `pairing_code` is only set in `PairingPending`, `identity`
/// only in `Ready`. Every transition goes through [`Session::enter`].
#[derive(Debug, Default)]
pub(crate) struct Session {
    state: SessionState,
    pairing_code: Option<String>,
    identity: Option<AccountInfo>,
    pub(crate) reconnect: Option<ScheduledTask>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn pairing_code(&self) -> Option<&str> {
        self.pairing_code.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn identity(&self) -> Option<&AccountInfo> {
        self.identity.as_ref()
    }

    pub(crate) fn enter(&mut self, state: SessionState) {
        self.state = state;
        if state != SessionState::PairingPending {
            self.pairing_code = None;
        }
        if state != SessionState::Ready {
            self.identity = None;
        }
    }

    pub(crate) fn pairing(&mut self, code: String) {
        self.enter(SessionState::PairingPending);
        self.pairing_code = Some(code);
    }

    pub(crate) fn ready(&mut self, identity: AccountInfo) {
        self.enter(SessionState::Ready);
        self.identity = Some(identity);
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            pairing_code: self.pairing_code.clone(),
            identity: self.identity.clone(),
        }
    }
}

/// Read-only copy of the session published to other components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub pairing_code: Option<String>,
    pub identity: Option<AccountInfo>,
}

impl SessionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn has_pairing_code(&self) -> bool {
        self.pairing_code.is_some()
    }
}

/// Non-blocking status summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub has_pairing_code: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AccountInfo {
        AccountInfo {
            id: "393331234567@c.us".to_string(),
            name: Some("Relay".to_string()),
        }
    }

    #[test]
    fn test_pairing_code_only_in_pairing_pending() {
        let mut session = Session::new();
        session.pairing("qr-1".to_string());
        assert_eq!(session.state(), SessionState::PairingPending);
        assert_eq!(session.pairing_code(), Some("qr-1"));

        for state in [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::Authenticating,
            SessionState::Ready,
            SessionState::Disconnected,
            SessionState::ReconnectPending,
        ] {
            session.pairing("qr-2".to_string());
            session.enter(state);
            assert_eq!(session.pairing_code(), None, "code leaked into {}", state);
        }
    }

    #[test]
    fn test_identity_cleared_on_leaving_ready() {
        let mut session = Session::new();
        session.ready(identity());
        assert_eq!(session.identity(), Some(&identity()));

        session.enter(SessionState::Disconnected);
        assert_eq!(session.identity(), None);
    }

    #[test]
    fn test_ready_clears_pairing_code() {
        let mut session = Session::new();
        session.pairing("qr".to_string());
        session.ready(identity());

        let snapshot = session.snapshot();
        assert!(snapshot.is_ready());
        assert!(!snapshot.has_pairing_code());
    }

    #[test]
    fn test_state_metric_values_are_distinct() {
        let values: std::collections::HashSet<_> = [
            SessionState::Idle,
            SessionState::Connecting,
            SessionState::PairingPending,
            SessionState::Authenticating,
            SessionState::Ready,
            SessionState::Disconnected,
            SessionState::ReconnectPending,
        ]
        .iter()
        .map(SessionState::as_metric)
        .collect();
        assert_eq!(values.len(), 7);
    }
}
