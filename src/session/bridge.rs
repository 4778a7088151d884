//! Transport backed by an external browser-automation bridge.
//!
//! The bridge process drives the messaging web client and speaks JSON over a
//! WebSocket. Requests carry a `requestId` and are answered by a `result`
//! message; lifecycle notifications (`qr`, `ready`, ...) arrive unsolicited.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

use crate::config::SessionConfig;

use super::transport::{
    AccountInfo, ChatSummary, DisconnectReason, Transport, TransportError, TransportEvent,
    TransportEvents, TransportFactory,
};

/// How long to wait for the bridge to answer a request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Messages sent to the bridge
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    #[serde(rename_all = "camelCase")]
    Initialize {
        client_id: &'a str,
        data_path: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        request_id: Uuid,
        to: &'a str,
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    GetChats { request_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Logout { request_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Destroy { request_id: Uuid },
}

/// Messages received from the bridge
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeMessage {
    Qr {
        qr: String,
    },
    Authenticated,
    Ready {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
    AuthFailure {
        #[serde(default)]
        message: String,
    },
    Disconnected {
        #[serde(default)]
        reason: String,
    },
    Message {
        from: String,
        #[serde(default)]
        body: String,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        request_id: Uuid,
        success: bool,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        chats: Option<Vec<ChatSummary>>,
    },
}

#[derive(Debug)]
struct BridgeReply {
    success: bool,
    error: Option<String>,
    chats: Option<Vec<ChatSummary>>,
}

/// One WebSocket connection to the bridge
pub struct BridgeTransport {
    url: String,
    client_id: String,
    data_path: PathBuf,
    request_timeout: Duration,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    pending: Arc<DashMap<Uuid, oneshot::Sender<BridgeReply>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl BridgeTransport {
    pub fn new(url: impl Into<String>, client_id: impl Into<String>, data_path: PathBuf) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.into(),
            data_path,
            request_timeout: REQUEST_TIMEOUT,
            outbound: Mutex::new(None),
            pending: Arc::new(DashMap::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn write(&self, request: &BridgeRequest<'_>) -> Result<(), TransportError> {
        let payload =
            serde_json::to_string(request).map_err(|e| TransportError::Request(e.to_string()))?;
        let outbound = self.outbound.lock().map_err(|_| TransportError::Closed)?;
        outbound
            .as_ref()
            .ok_or(TransportError::Closed)?
            .send(Message::Text(payload.into()))
            .map_err(|_| TransportError::Closed)
    }

    /// Send a request and wait for its `result`
    async fn request<'b>(
        &self,
        build: impl FnOnce(Uuid) -> BridgeRequest<'b>,
    ) -> Result<BridgeReply, TransportError> {
        let request_id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id, tx);

        if let Err(e) = self.write(&build(request_id)) {
            self.pending.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                self.pending.remove(&request_id);
                Err(TransportError::Timeout)
            }
        }
    }

    fn abort_tasks(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
        if let Ok(mut outbound) = self.outbound.lock() {
            outbound.take();
        }
        self.pending.clear();
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    async fn connect(&self, events: TransportEvents) -> Result<(), TransportError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (mut sink, mut source) = stream.split();

        tracing::info!(url = %self.url, generation = events.generation(), "Connected to bridge");

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let writer = tokio::spawn(async move {
            while let Some(message) = out_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "Bridge write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let pending = self.pending.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<BridgeMessage>(&text) {
                        Ok(message) => handle_message(message, &events, &pending),
                        Err(e) => tracing::warn!(error = %e, "Unparseable bridge message"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Bridge read failed");
                        break;
                    }
                }
            }

            // Fail in-flight requests, then report the loss
            pending.clear();
            events.emit(TransportEvent::Disconnected(DisconnectReason::Other(
                "bridge connection closed".to_string(),
            )));
        });

        {
            let mut outbound = self.outbound.lock().map_err(|_| TransportError::Closed)?;
            *outbound = Some(out_tx);
        }
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.push(writer);
            tasks.push(reader);
        }

        let data_path = self.data_path.to_string_lossy();
        self.write(&BridgeRequest::Initialize {
            client_id: &self.client_id,
            data_path: &data_path,
        })
    }

    async fn send_message(&self, destination: &str, text: &str) -> Result<(), TransportError> {
        let reply = self
            .request(|request_id| BridgeRequest::Send {
                request_id,
                to: destination,
                text,
            })
            .await?;

        if reply.success {
            Ok(())
        } else {
            Err(TransportError::Send(reply.error.unwrap_or_default()))
        }
    }

    async fn get_chats(&self) -> Result<Vec<ChatSummary>, TransportError> {
        let reply = self
            .request(|request_id| BridgeRequest::GetChats { request_id })
            .await?;

        if reply.success {
            Ok(reply.chats.unwrap_or_default())
        } else {
            Err(TransportError::Request(reply.error.unwrap_or_default()))
        }
    }

    async fn logout(&self) -> Result<(), TransportError> {
        let reply = self
            .request(|request_id| BridgeRequest::Logout { request_id })
            .await?;

        if reply.success {
            Ok(())
        } else {
            Err(TransportError::Request(reply.error.unwrap_or_default()))
        }
    }

    async fn destroy(&self) -> Result<(), TransportError> {
        let result = match self
            .request(|request_id| BridgeRequest::Destroy { request_id })
            .await
        {
            Ok(reply) if reply.success => Ok(()),
            Ok(reply) => Err(TransportError::Request(reply.error.unwrap_or_default())),
            // Nothing left to release
            Err(TransportError::Closed) => Ok(()),
            Err(e) => Err(e),
        };

        self.abort_tasks();
        result
    }
}

impl Drop for BridgeTransport {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

fn handle_message(
    message: BridgeMessage,
    events: &TransportEvents,
    pending: &DashMap<Uuid, oneshot::Sender<BridgeReply>>,
) {
    let event = match message {
        BridgeMessage::Qr { qr } => TransportEvent::QrIssued(qr),
        BridgeMessage::Authenticated => TransportEvent::Authenticated,
        BridgeMessage::Ready { id, name } => TransportEvent::Ready(AccountInfo { id, name }),
        BridgeMessage::AuthFailure { message } => TransportEvent::AuthFailed(message),
        BridgeMessage::Disconnected { reason } => {
            TransportEvent::Disconnected(DisconnectReason::from_reason(&reason))
        }
        BridgeMessage::Message { from, body } => TransportEvent::MessageReceived { from, body },
        BridgeMessage::Result {
            request_id,
            success,
            error,
            chats,
        } => {
            match pending.remove(&request_id) {
                Some((_, reply)) => {
                    let _ = reply.send(BridgeReply {
                        success,
                        error,
                        chats,
                    });
                }
                None => tracing::debug!(%request_id, "Result for unknown request"),
            }
            return;
        }
    };

    events.emit(event);
}

/// Creates a fresh [`BridgeTransport`] per connection attempt
#[derive(Debug, Clone)]
pub struct BridgeTransportFactory {
    url: String,
    client_id: String,
    data_path: PathBuf,
}

impl BridgeTransportFactory {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            url: config.bridge_url.clone(),
            client_id: config.client_id.clone(),
            data_path: config.data_path.clone(),
        }
    }
}

impl TransportFactory for BridgeTransportFactory {
    fn create(&self) -> Arc<dyn Transport> {
        Arc::new(BridgeTransport::new(
            self.url.clone(),
            self.client_id.clone(),
            self.data_path.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (TransportEvents, mpsc::UnboundedReceiver<(u64, TransportEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TransportEvents::new(1, tx), rx)
    }

    #[test]
    fn test_request_wire_format() {
        let id = Uuid::nil();
        let value = serde_json::to_value(BridgeRequest::Send {
            request_id: id,
            to: "1@g.us",
            text: "ciao",
        })
        .unwrap();

        assert_eq!(value["type"], "send");
        assert_eq!(value["requestId"], id.to_string());
        assert_eq!(value["to"], "1@g.us");

        let init = serde_json::to_value(BridgeRequest::Initialize {
            client_id: "main",
            data_path: "./wa-session",
        })
        .unwrap();
        assert_eq!(init["type"], "initialize");
        assert_eq!(init["clientId"], "main");
    }

    #[test]
    fn test_lifecycle_messages_become_events() {
        let (events, mut rx) = sink();
        let pending = DashMap::new();

        for raw in [
            r#"{"type":"qr","qr":"code-1"}"#,
            r#"{"type":"authenticated"}"#,
            r#"{"type":"ready","id":"39333@c.us","name":"Relay"}"#,
            r#"{"type":"disconnected","reason":"LOGOUT"}"#,
        ] {
            handle_message(serde_json::from_str(raw).unwrap(), &events, &pending);
        }

        assert_eq!(rx.try_recv().unwrap().1, TransportEvent::QrIssued("code-1".to_string()));
        assert_eq!(rx.try_recv().unwrap().1, TransportEvent::Authenticated);
        assert!(matches!(rx.try_recv().unwrap().1, TransportEvent::Ready(_)));
        assert_eq!(
            rx.try_recv().unwrap().1,
            TransportEvent::Disconnected(DisconnectReason::Logout)
        );
    }

    #[test]
    fn test_result_completes_pending_request() {
        let (events, mut rx) = sink();
        let pending = DashMap::new();
        let id = Uuid::new_v4();
        let (tx, mut reply_rx) = oneshot::channel();
        pending.insert(id, tx);

        let raw = format!(
            r#"{{"type":"result","requestId":"{}","success":true,"chats":[{{"id":"1@g.us","name":"Team","isGroup":true,"unreadCount":0}}]}}"#,
            id
        );
        handle_message(serde_json::from_str(&raw).unwrap(), &events, &pending);

        let reply = reply_rx.try_recv().unwrap();
        assert!(reply.success);
        assert_eq!(reply.chats.unwrap()[0].id, "1@g.us");
        assert!(pending.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_requests_fail_when_not_connected() {
        let transport = BridgeTransport::new("ws://127.0.0.1:1", "main", PathBuf::from("."))
            .with_request_timeout(Duration::from_millis(50));

        assert_eq!(
            transport.send_message("1@g.us", "x").await,
            Err(TransportError::Closed)
        );
        assert!(transport.destroy().await.is_ok());
    }

    #[tokio::test]
    async fn test_send_round_trip_through_local_bridge() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let bridge = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let mut seen = Vec::new();
            while let Some(Ok(frame)) = socket.next().await {
                let Ok(text) = frame.to_text() else { continue };
                let request: serde_json::Value = serde_json::from_str(text).unwrap();
                seen.push(request["type"].as_str().unwrap_or_default().to_string());
                if request["type"] == "send" {
                    let reply = serde_json::json!({
                        "type": "result",
                        "requestId": request["requestId"],
                        "success": true
                    });
                    socket.send(Message::Text(reply.to_string().into())).await.unwrap();
                    break;
                }
            }
            seen
        });

        let transport = BridgeTransport::new(&url, "main", PathBuf::from("./wa-session"))
            .with_request_timeout(Duration::from_secs(5));
        let (events, _rx) = sink();
        transport.connect(events).await.unwrap();

        assert_eq!(transport.send_message("1@g.us", "ciao").await, Ok(()));
        assert_eq!(bridge.await.unwrap(), vec!["initialize", "send"]);
        assert!(transport.destroy().await.is_ok());
    }
}
