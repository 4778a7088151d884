//! Shared fixtures: an in-process transport and credential store

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use lead_notification_relay::config::{AuthFailurePolicy, SessionConfig};
use lead_notification_relay::session::{
    AccountInfo, ChatSummary, CredentialStore, SessionManager, SessionSnapshot, SessionState,
    Transport, TransportError, TransportEvent, TransportEvents, TransportFactory,
};

/// Transport double recording every call
#[derive(Default)]
pub struct FakeTransport {
    index: usize,
    calls: CallLog,
    events: Mutex<Option<TransportEvents>>,
    sent: Mutex<Vec<(String, String)>>,
    chats: Mutex<Vec<ChatSummary>>,
    fail_connect: bool,
    fail_send: bool,
    fail_destroy: bool,
    hang_destroy: bool,
    logged_out: AtomicBool,
    destroyed: AtomicBool,
}

impl FakeTransport {
    /// Emit a lifecycle event as this instance
    pub fn emit(&self, event: TransportEvent) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(events) => events.emit(event),
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.events.lock().unwrap().is_some()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_chats(&self, chats: Vec<ChatSummary>) {
        *self.chats.lock().unwrap() = chats;
    }

    pub fn logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, events: TransportEvents) -> Result<(), TransportError> {
        self.calls.record(format!("connect({})", self.index));
        if self.fail_connect {
            return Err(TransportError::Connect("bridge unreachable".to_string()));
        }
        *self.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn send_message(&self, destination: &str, text: &str) -> Result<(), TransportError> {
        if self.fail_send {
            return Err(TransportError::Send("rejected".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(())
    }

    async fn get_chats(&self) -> Result<Vec<ChatSummary>, TransportError> {
        Ok(self.chats.lock().unwrap().clone())
    }

    async fn logout(&self) -> Result<(), TransportError> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        self.calls.record(format!("destroy({})", self.index));
        self.destroyed.store(true, Ordering::SeqCst);
        if self.hang_destroy {
            std::future::pending::<()>().await;
        }
        if self.fail_destroy {
            return Err(TransportError::Request("browser already gone".to_string()));
        }
        Ok(())
    }
}

/// Ordered record of transport calls across all instances
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn record(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Position of `call` in the log
    pub fn position(&self, call: &str) -> Option<usize> {
        self.entries().iter().position(|entry| entry == call)
    }
}

/// Factory keeping a handle to every instance it created
#[derive(Default)]
pub struct FakeFactory {
    created: Mutex<Vec<Arc<FakeTransport>>>,
    pub calls: CallLog,
    pub fail_connect: AtomicBool,
    pub fail_send: AtomicBool,
    pub fail_destroy: AtomicBool,
    pub hang_destroy: AtomicBool,
}

impl FakeFactory {
    pub fn count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn get(&self, index: usize) -> Option<Arc<FakeTransport>> {
        self.created.lock().unwrap().get(index).cloned()
    }

    /// Wait until instance `index` exists and has been connected
    pub async fn connected(&self, index: usize) -> Arc<FakeTransport> {
        for _ in 0..10_000 {
            if let Some(transport) = self.get(index) {
                if transport.is_connected() {
                    return transport;
                }
            }
            tokio::task::yield_now().await;
        }
        panic!("transport {} never connected", index);
    }
}

impl TransportFactory for FakeFactory {
    fn create(&self) -> Arc<dyn Transport> {
        let mut created = self.created.lock().unwrap();
        let transport = Arc::new(FakeTransport {
            index: created.len(),
            calls: self.calls.clone(),
            fail_connect: self.fail_connect.load(Ordering::SeqCst),
            fail_send: self.fail_send.load(Ordering::SeqCst),
            fail_destroy: self.fail_destroy.load(Ordering::SeqCst),
            hang_destroy: self.hang_destroy.load(Ordering::SeqCst),
            ..Default::default()
        });
        created.push(transport.clone());
        transport
    }
}

/// Credential store counting purges
#[derive(Default)]
pub struct FakeCredentials {
    purges: AtomicUsize,
}

impl FakeCredentials {
    pub fn purges(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for FakeCredentials {
    async fn purge(&self) -> io::Result<()> {
        self.purges.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub session: SessionManager,
    pub factory: Arc<FakeFactory>,
    pub credentials: Arc<FakeCredentials>,
    pub shutdown: broadcast::Sender<()>,
    pub handle: JoinHandle<()>,
}

pub fn session_config(auth_failure: AuthFailurePolicy) -> SessionConfig {
    SessionConfig {
        client_id: "test".to_string(),
        data_path: "./wa-session-test".into(),
        bridge_url: "ws://127.0.0.1:0".to_string(),
        reconnect_delay_secs: 5,
        teardown_timeout_secs: 1,
        auth_failure,
    }
}

pub fn spawn_session(config: SessionConfig) -> Harness {
    let factory = Arc::new(FakeFactory::default());
    let credentials = Arc::new(FakeCredentials::default());
    let (shutdown, _) = broadcast::channel(4);

    let (session, handle) = SessionManager::spawn(
        config,
        factory.clone(),
        credentials.clone(),
        shutdown.clone(),
    );

    Harness {
        session,
        factory,
        credentials,
        shutdown,
        handle,
    }
}

pub fn account() -> AccountInfo {
    AccountInfo {
        id: "393331234567@c.us".to_string(),
        name: Some("Relay".to_string()),
    }
}

/// Wait until the published snapshot satisfies `check`
pub async fn wait_until(session: &SessionManager, check: impl Fn(&SessionSnapshot) -> bool) {
    for _ in 0..10_000 {
        if check(&session.snapshot()) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("session never reached expected state: {:?}", session.snapshot());
}

pub async fn wait_for_state(session: &SessionManager, state: SessionState) {
    wait_until(session, |s| s.state == state).await;
}

/// Spin the scheduler so pending tasks can run
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

/// Boot a session and drive it to `Ready`
pub async fn ready_session(harness: &Harness) -> Arc<FakeTransport> {
    harness
        .session
        .connect(lead_notification_relay::session::ConnectTrigger::Boot)
        .await
        .unwrap();
    let transport = harness.factory.connected(0).await;
    transport.emit(TransportEvent::Ready(account()));
    wait_for_state(&harness.session, SessionState::Ready).await;
    transport
}
