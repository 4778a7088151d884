//! Boundary to the messaging transport.
//!
//! The transport (pairing, browser automation, message encoding) is an
//! external collaborator. A fresh instance is created for every connection
//! attempt; its lifecycle events are tagged with the attempt generation so
//! the session manager can ignore anything a torn-down instance still emits.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Transport request timed out")]
    Timeout,

    #[error("Transport connection closed")]
    Closed,
}

/// Account the session is authenticated as
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Serialized account id, e.g. `393331234567@c.us`
    pub id: String,
    /// Display name of the account, if known
    #[serde(default)]
    pub name: Option<String>,
}

/// A chat (individual or group) known to the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub unread_count: u32,
}

/// Why the transport disconnected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The account was logged out (from this service or from the phone)
    Logout,
    Other(String),
}

impl DisconnectReason {
    /// Map a transport-reported reason string
    pub fn from_reason(reason: &str) -> Self {
        if reason.eq_ignore_ascii_case("LOGOUT") {
            DisconnectReason::Logout
        } else {
            DisconnectReason::Other(reason.to_string())
        }
    }

    pub fn is_logout(&self) -> bool {
        matches!(self, DisconnectReason::Logout)
    }
}

/// Lifecycle events emitted by a transport instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A new pairing code is waiting to be scanned
    QrIssued(String),
    Authenticated,
    Ready(AccountInfo),
    AuthFailed(String),
    Disconnected(DisconnectReason),
    /// Inbound message; logged only
    MessageReceived { from: String, body: String },
}

/// Sink handed to a transport on connect
#[derive(Debug, Clone)]
pub struct TransportEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl TransportEvents {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Forward an event to the session manager. Returns false once the manager is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// One connection to the messaging network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start the connection. Lifecycle events are reported through `events`.
    async fn connect(&self, events: TransportEvents) -> Result<(), TransportError>;

    async fn send_message(&self, destination: &str, text: &str) -> Result<(), TransportError>;

    async fn get_chats(&self) -> Result<Vec<ChatSummary>, TransportError>;

    /// Log the account out, invalidating its credentials
    async fn logout(&self) -> Result<(), TransportError>;

    /// Release every resource held by this instance
    async fn destroy(&self) -> Result<(), TransportError>;
}

/// Creates transport instances, one per connection attempt
pub trait TransportFactory: Send + Sync {
    fn create(&self) -> Arc<dyn Transport>;
}
