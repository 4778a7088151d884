use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::directory::{DirectoryError, RecipientDirectory, LUISS_DESTINATION, LUISS_NAME};
use crate::metrics::{MessageMetrics, WebhookMetrics};
use crate::session::{SendAck, SessionError, SessionManager};
use crate::template::TemplateResolver;

use super::{EventType, NotificationEvent};

/// A rendered message bound to its destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub event_type: EventType,
    /// Name of the template rule that produced `text`
    pub rule: &'static str,
    pub recipient_name: String,
    pub destination: String,
    pub text: String,
}

/// Statistics for the notification dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    /// Events accepted for dispatch
    pub total_dispatched: AtomicU64,
    /// Messages handed to the transport successfully
    pub total_sent: AtomicU64,
    /// Sends that failed (not ready or transport error)
    pub total_failed: AtomicU64,
    /// Events dropped because the recipient id is unknown
    pub recipients_not_found: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_dispatched: self.total_dispatched.load(Ordering::Relaxed),
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            recipients_not_found: self.recipients_not_found.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of dispatcher statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_dispatched: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub recipients_not_found: u64,
}

/// Turns inbound events into exactly one message to exactly one destination
pub struct NotificationDispatcher {
    directory: Arc<RecipientDirectory>,
    resolver: TemplateResolver,
    session: SessionManager,
    stats: DispatcherStats,
}

impl NotificationDispatcher {
    pub fn new(
        directory: Arc<RecipientDirectory>,
        resolver: TemplateResolver,
        session: SessionManager,
    ) -> Self {
        Self {
            directory,
            resolver,
            session,
            stats: DispatcherStats::default(),
        }
    }

    /// Resolve the destination and render the text.
    ///
    /// Luiss leads go to a fixed destination and never consult the directory.
    pub fn prepare(&self, event: &NotificationEvent) -> Result<OutboundMessage, DirectoryError> {
        let (recipient_name, destination) = match event.event_type {
            EventType::LuissLead => (LUISS_NAME.to_string(), LUISS_DESTINATION.to_string()),
            _ => {
                let record = self.directory.resolve(event.recipient())?;
                (record.name.clone(), record.destination.clone())
            }
        };

        let rendered = self.resolver.render(event);

        Ok(OutboundMessage {
            event_type: event.event_type,
            rule: rendered.rule,
            recipient_name,
            destination,
            text: rendered.text,
        })
    }

    /// Send a prepared message and record the outcome
    pub async fn deliver(&self, message: &OutboundMessage) -> Result<SendAck, SessionError> {
        let started = Instant::now();

        match self.session.send(&message.destination, &message.text).await {
            Ok(ack) => {
                self.stats.total_sent.fetch_add(1, Ordering::Relaxed);
                MessageMetrics::record_sent(message.event_type, started.elapsed());
                tracing::info!(
                    event = %message.event_type,
                    rule = message.rule,
                    recipient = %message.recipient_name,
                    destination = %message.destination,
                    "Message sent"
                );
                Ok(ack)
            }
            Err(e) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                MessageMetrics::record_failed(message.event_type);
                tracing::error!(
                    event = %message.event_type,
                    recipient = %message.recipient_name,
                    destination = %message.destination,
                    error = %e,
                    "Message send failed"
                );
                Err(e)
            }
        }
    }

    /// Fire-and-forget dispatch.
    ///
    /// The send runs on its own task; the returned handle may be dropped.
    /// An unknown recipient is logged and nothing is sent.
    #[tracing::instrument(skip(self, event), fields(event = %event.event_type, recipient_id = %event.recipient()))]
    pub fn dispatch(self: &Arc<Self>, event: NotificationEvent) -> Option<JoinHandle<()>> {
        self.stats.total_dispatched.fetch_add(1, Ordering::Relaxed);

        let message = match self.prepare(&event) {
            Ok(message) => message,
            Err(e) => {
                self.stats.recipients_not_found.fetch_add(1, Ordering::Relaxed);
                WebhookMetrics::record_recipient_not_found();
                tracing::warn!(error = %e, "Recipient not found, message not sent");
                return None;
            }
        };

        tracing::debug!(rule = message.rule, destination = %message.destination, "Dispatching message");

        let dispatcher = Arc::clone(self);
        Some(tokio::spawn(async move {
            // Failures are already logged and counted
            let _ = dispatcher.deliver(&message).await;
        }))
    }

    pub fn directory(&self) -> &RecipientDirectory {
        &self.directory
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }
}
