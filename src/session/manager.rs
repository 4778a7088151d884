//! Session lifecycle manager.
//!
//! A single task owns the [`Session`] and the current transport instance.
//! Everything else talks to it through [`SessionManager`]: commands go in
//! over an mpsc channel, state comes out through a watch channel. Transport
//! events arrive on their own channel, tagged with the generation of the
//! instance that produced them.
//!
//! Ordering rules enforced here:
//! - at most one connection attempt is in flight (`connecting` guard);
//! - the previous transport is torn down before the next one connects,
//!   best-effort and bounded by `teardown_timeout`;
//! - at most one reconnect is scheduled at a time;
//! - a logout disconnect purges credentials and schedules nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::{AuthFailurePolicy, SessionConfig};
use crate::metrics::SessionMetrics;

use super::credentials::CredentialStore;
use super::pairing::PairingPayload;
use super::schedule::ScheduledTask;
use super::state::{Session, SessionSnapshot, SessionState, SessionStatus};
use super::transport::{
    ChatSummary, DisconnectReason, Transport, TransportError, TransportEvent, TransportEvents,
    TransportFactory,
};
use super::SessionError;

/// Command channel capacity
const COMMAND_BUFFER: usize = 64;

/// What asked for a connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectTrigger {
    Boot,
    Reconnect,
    Manual,
}

/// Acknowledgement of a delivered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck {
    pub destination: String,
}

/// Whether a caller may use a transport that is not `Ready` yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Ready,
    Any,
}

enum Command {
    Connect {
        trigger: ConnectTrigger,
    },
    ConnectFinished {
        generation: u64,
        result: Result<(), TransportError>,
    },
    Acquire {
        access: Access,
        reply: oneshot::Sender<Result<(u64, Arc<dyn Transport>), SessionError>>,
    },
    LoggedOut {
        generation: u64,
    },
}

/// Handle to the session task. Cheap to clone.
#[derive(Clone)]
pub struct SessionManager {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionManager {
    /// Spawn the session task. It runs until `shutdown` fires.
    pub fn spawn(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        credentials: Arc<dyn CredentialStore>,
        shutdown: broadcast::Sender<()>,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let actor = SessionActor {
            config,
            factory,
            credentials,
            session: Session::new(),
            transport: None,
            generation: 0,
            connecting: false,
            commands: cmd_tx.clone(),
            cmd_rx,
            event_tx,
            event_rx,
            snapshot: snapshot_tx,
            shutdown,
        };
        let handle = tokio::spawn(actor.run());

        (
            Self {
                commands: cmd_tx,
                snapshot: snapshot_rx,
            },
            handle,
        )
    }

    /// Request a connection attempt. A no-op while one is already in flight.
    pub async fn connect(&self, trigger: ConnectTrigger) -> Result<(), SessionError> {
        self.commands
            .send(Command::Connect { trigger })
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub fn current_status(&self) -> SessionStatus {
        let snapshot = self.snapshot.borrow();
        SessionStatus {
            state: snapshot.state,
            has_pairing_code: snapshot.has_pairing_code(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Current pairing code, only while pairing is pending
    pub fn current_pairing(&self) -> Option<PairingPayload> {
        let snapshot = self.snapshot.borrow();
        match (snapshot.state, &snapshot.pairing_code) {
            (SessionState::PairingPending, Some(code)) => Some(PairingPayload::new(code.clone())),
            _ => None,
        }
    }

    /// Send a text message. Fails fast with `NotReady`; never retries.
    pub async fn send(&self, destination: &str, text: &str) -> Result<SendAck, SessionError> {
        if !self.snapshot.borrow().is_ready() {
            return Err(SessionError::NotReady);
        }

        let (_, transport) = self.acquire(Access::Ready).await?;
        transport.send_message(destination, text).await?;

        Ok(SendAck {
            destination: destination.to_string(),
        })
    }

    pub async fn chats(&self) -> Result<Vec<ChatSummary>, SessionError> {
        let (_, transport) = self.acquire(Access::Ready).await?;
        Ok(transport.get_chats().await?)
    }

    /// Log the account out, clear local state and purge stored credentials
    pub async fn logout(&self) -> Result<(), SessionError> {
        let (generation, transport) = self.acquire(Access::Any).await?;
        transport.logout().await?;

        self.commands
            .send(Command::LoggedOut { generation })
            .await
            .map_err(|_| SessionError::Closed)
    }

    async fn acquire(&self, access: Access) -> Result<(u64, Arc<dyn Transport>), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Acquire { access, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }
}

struct SessionActor {
    config: SessionConfig,
    factory: Arc<dyn TransportFactory>,
    credentials: Arc<dyn CredentialStore>,
    session: Session,
    transport: Option<Arc<dyn Transport>>,
    /// Incremented whenever a transport is created or retired
    generation: u64,
    /// Guard: a connection attempt is in flight
    connecting: bool,
    commands: mpsc::Sender<Command>,
    cmd_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    event_rx: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    snapshot: watch::Sender<SessionSnapshot>,
    shutdown: broadcast::Sender<()>,
}

impl SessionActor {
    async fn run(mut self) {
        let mut shutdown_rx = self.shutdown.subscribe();
        self.publish();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session manager shutting down");
                    break;
                }
                Some(command) = self.cmd_rx.recv() => self.handle_command(command),
                Some((generation, event)) = self.event_rx.recv() => {
                    self.handle_event(generation, event);
                }
            }
            self.publish();
        }

        self.session.reconnect.take();
        if let Some(transport) = self.retire_transport() {
            teardown(transport, self.config.teardown_timeout()).await;
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { trigger } => self.begin_connect(trigger),
            Command::ConnectFinished { generation, result } => {
                self.connect_finished(generation, result)
            }
            Command::Acquire { access, reply } => {
                let _ = reply.send(self.acquire(access));
            }
            Command::LoggedOut { generation } => self.logged_out(generation),
        }
    }

    fn acquire(&self, access: Access) -> Result<(u64, Arc<dyn Transport>), SessionError> {
        let transport = match (&self.transport, access) {
            (Some(transport), Access::Any) => transport,
            (Some(transport), Access::Ready) if self.session.state() == SessionState::Ready => {
                transport
            }
            (None, Access::Any) => return Err(SessionError::NoSession),
            _ => return Err(SessionError::NotReady),
        };
        Ok((self.generation, transport.clone()))
    }

    #[tracing::instrument(name = "session.connect", skip(self))]
    fn begin_connect(&mut self, trigger: ConnectTrigger) {
        if self.connecting {
            tracing::debug!(?trigger, "Connection attempt already in flight, ignoring");
            return;
        }
        self.connecting = true;

        // Recreate rather than reset; this also drops any pending reconnect
        let previous = self.retire_transport();
        self.session = Session::new();
        self.session.enter(SessionState::Connecting);

        self.generation += 1;
        let generation = self.generation;
        let transport = self.factory.create();
        self.transport = Some(transport.clone());

        let events = TransportEvents::new(generation, self.event_tx.clone());
        let commands = self.commands.clone();
        let teardown_timeout = self.config.teardown_timeout();

        tracing::info!(generation, ?trigger, "Connecting messaging transport");

        tokio::spawn(async move {
            if let Some(previous) = previous {
                teardown(previous, teardown_timeout).await;
            }
            let result = transport.connect(events).await;
            let _ = commands
                .send(Command::ConnectFinished { generation, result })
                .await;
        });
    }

    fn connect_finished(&mut self, generation: u64, result: Result<(), TransportError>) {
        if generation != self.generation {
            return;
        }
        if let Err(e) = result {
            tracing::error!(generation, error = %e, "Transport failed to start");
            self.on_disconnected(DisconnectReason::Other(e.to_string()));
        }
    }

    fn handle_event(&mut self, generation: u64, event: TransportEvent) {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                ?event,
                "Ignoring event from retired transport"
            );
            return;
        }

        match event {
            TransportEvent::QrIssued(code) => {
                tracing::info!(generation, "Pairing code issued, waiting for scan");
                SessionMetrics::record_pairing_code();
                self.session.pairing(code);
            }
            TransportEvent::Authenticated => {
                tracing::info!(generation, "Transport authenticated");
                self.session.enter(SessionState::Authenticating);
            }
            TransportEvent::Ready(identity) => {
                tracing::info!(generation, account = %identity.id, "Messaging session ready");
                self.connecting = false;
                self.session.reconnect.take();
                self.session.ready(identity);
            }
            TransportEvent::AuthFailed(message) => {
                tracing::error!(generation, message = %message, "Transport authentication failed");
                self.on_auth_failure();
            }
            TransportEvent::Disconnected(reason) => {
                tracing::warn!(generation, ?reason, "Transport disconnected");
                self.on_disconnected(reason);
            }
            TransportEvent::MessageReceived { from, body } => {
                tracing::info!(from = %from, length = body.len(), "Inbound message received");
            }
        }
    }

    fn on_auth_failure(&mut self) {
        self.connecting = false;
        match self.config.auth_failure {
            AuthFailurePolicy::Reconnect => {
                self.on_disconnected(DisconnectReason::Other("auth failure".to_string()));
            }
            AuthFailurePolicy::Terminate => {
                tracing::error!("Terminating so the supervisor can restart with a fresh session");
                self.session.enter(SessionState::Disconnected);
                let _ = self.shutdown.send(());
            }
        }
    }

    fn on_disconnected(&mut self, reason: DisconnectReason) {
        self.connecting = false;

        if reason.is_logout() {
            self.session.reconnect.take();
            self.session.enter(SessionState::Disconnected);
            self.purge_credentials();
            if let Some(transport) = self.retire_transport() {
                tokio::spawn(teardown(transport, self.config.teardown_timeout()));
            }
            tracing::warn!("Logged out; a new pairing is required");
            return;
        }

        if self.session.reconnect.is_some() {
            tracing::debug!("Reconnect already scheduled");
            return;
        }
        self.session.enter(SessionState::Disconnected);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.session.reconnect.is_some() {
            return;
        }

        let delay = self.config.reconnect_delay();
        let commands = self.commands.clone();
        let task = ScheduledTask::after(delay, self.shutdown.subscribe(), async move {
            tracing::info!("Attempting reconnection");
            let _ = commands
                .send(Command::Connect {
                    trigger: ConnectTrigger::Reconnect,
                })
                .await;
        });

        tracing::info!(delay_secs = delay.as_secs(), "Reconnect scheduled");
        SessionMetrics::record_reconnect_scheduled();
        self.session.reconnect = Some(task);
        self.session.enter(SessionState::ReconnectPending);
    }

    fn logged_out(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        tracing::info!(generation, "Session logged out");
        self.on_disconnected(DisconnectReason::Logout);
    }

    fn purge_credentials(&self) {
        let credentials = self.credentials.clone();
        tokio::spawn(async move {
            if let Err(e) = credentials.purge().await {
                tracing::error!(error = %e, "Failed to purge session credentials");
            }
        });
    }

    /// Detach the current transport; its later events become stale
    fn retire_transport(&mut self) -> Option<Arc<dyn Transport>> {
        let transport = self.transport.take();
        if transport.is_some() {
            self.generation += 1;
        }
        transport
    }

    fn publish(&self) {
        let snapshot = self.session.snapshot();
        SessionMetrics::set_state(snapshot.state);
        self.snapshot.send_if_modified(|current| {
            if *current != snapshot {
                *current = snapshot;
                true
            } else {
                false
            }
        });
    }
}

/// Release a transport, logging failures. Never blocks longer than `limit`.
async fn teardown(transport: Arc<dyn Transport>, limit: Duration) {
    match tokio::time::timeout(limit, transport.destroy()).await {
        Ok(Ok(())) => tracing::debug!("Previous transport released"),
        Ok(Err(e)) => tracing::warn!(error = %e, "Failed to release previous transport"),
        Err(_) => tracing::warn!("Timed out releasing previous transport"),
    }
}
