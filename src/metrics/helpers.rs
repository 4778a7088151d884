//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use crate::notification::EventType;
use crate::session::SessionState;

use super::{
    MESSAGES_FAILED_TOTAL, MESSAGES_SENT_TOTAL, MESSAGE_SEND_LATENCY, PAIRING_CODES_TOTAL,
    RECIPIENTS_NOT_FOUND_TOTAL, RECONNECTS_SCHEDULED_TOTAL, SESSION_READY, SESSION_STATE,
    WEBHOOKS_RECEIVED_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording session metrics
pub struct SessionMetrics;

impl SessionMetrics {
    pub fn set_state(state: SessionState) {
        SESSION_STATE.set(state.as_metric());
        SESSION_READY.set(i64::from(state == SessionState::Ready));
    }

    pub fn record_pairing_code() {
        PAIRING_CODES_TOTAL.inc();
    }

    pub fn record_reconnect_scheduled() {
        RECONNECTS_SCHEDULED_TOTAL.inc();
    }
}

/// Helper struct for recording webhook metrics
pub struct WebhookMetrics;

impl WebhookMetrics {
    pub fn record_received(endpoint: &str) {
        WEBHOOKS_RECEIVED_TOTAL.with_label_values(&[endpoint]).inc();
    }

    pub fn record_recipient_not_found() {
        RECIPIENTS_NOT_FOUND_TOTAL.inc();
    }
}

/// Helper struct for recording outbound message metrics
pub struct MessageMetrics;

impl MessageMetrics {
    pub fn record_sent(event: EventType, elapsed: Duration) {
        MESSAGES_SENT_TOTAL.with_label_values(&[event.as_str()]).inc();
        MESSAGE_SEND_LATENCY
            .with_label_values(&[event.as_str()])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_failed(event: EventType) {
        MESSAGES_FAILED_TOTAL
            .with_label_values(&[event.as_str()])
            .inc();
    }
}
