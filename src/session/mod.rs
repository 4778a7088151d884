//! Messaging session lifecycle.
//!
//! Owns the single transport connection: creates it, follows its lifecycle
//! events, serializes reconnects and exposes readiness and the pairing code.

mod bridge;
mod credentials;
mod manager;
mod pairing;
mod schedule;
mod state;
mod transport;

use thiserror::Error;

pub use bridge::{BridgeTransport, BridgeTransportFactory};
pub use credentials::{CredentialStore, LocalCredentialStore};
pub use manager::{ConnectTrigger, SendAck, SessionManager};
pub use pairing::{PairingError, PairingPayload};
pub use schedule::ScheduledTask;
pub use state::{SessionSnapshot, SessionState, SessionStatus};
pub use transport::{
    AccountInfo, ChatSummary, DisconnectReason, Transport, TransportError, TransportEvent,
    TransportEvents, TransportFactory,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session is not in the `Ready` state
    #[error("Messaging session not ready")]
    NotReady,

    /// No transport instance exists
    #[error("No active messaging session")]
    NoSession,

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session task has stopped
    #[error("Session manager stopped")]
    Closed,
}
