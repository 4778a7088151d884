//! Prometheus metrics for the relay.
//!
//! - Session metrics (lifecycle state, pairing codes, reconnects)
//! - Webhook metrics (requests per endpoint, unknown recipients)
//! - Message metrics (sent and failed per event type)

mod helpers;

pub use helpers::{encode_metrics, MessageMetrics, SessionMetrics, WebhookMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "relay";

lazy_static! {
    // ============================================================================
    // Session Metrics
    // ============================================================================

    /// Current session state (0=idle .. 6=reconnect_pending)
    pub static ref SESSION_STATE: IntGauge = register_int_gauge!(
        format!("{}_session_state", METRIC_PREFIX),
        "Current session state (0=idle, 1=connecting, 2=pairing_pending, 3=authenticating, 4=ready, 5=disconnected, 6=reconnect_pending)"
    ).unwrap();

    /// Session ready (1=ready, 0=not ready)
    pub static ref SESSION_READY: IntGauge = register_int_gauge!(
        format!("{}_session_ready", METRIC_PREFIX),
        "Session ready (1=ready, 0=not ready)"
    ).unwrap();

    /// Pairing codes issued by the transport
    pub static ref PAIRING_CODES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_pairing_codes_total", METRIC_PREFIX),
        "Total pairing codes issued"
    ).unwrap();

    /// Reconnects scheduled after a disconnect or failed attempt
    pub static ref RECONNECTS_SCHEDULED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_reconnects_scheduled_total", METRIC_PREFIX),
        "Total reconnect attempts scheduled"
    ).unwrap();

    // ============================================================================
    // Webhook Metrics
    // ============================================================================

    /// Webhook requests by endpoint
    pub static ref WEBHOOKS_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_webhooks_received_total", METRIC_PREFIX),
        "Total webhook requests received",
        &["endpoint"]
    ).unwrap();

    /// Webhooks addressed to an unknown recipient
    pub static ref RECIPIENTS_NOT_FOUND_TOTAL: IntCounter = register_int_counter!(
        format!("{}_recipients_not_found_total", METRIC_PREFIX),
        "Total webhooks whose recipient id is not in the directory"
    ).unwrap();

    // ============================================================================
    // Message Metrics
    // ============================================================================

    /// Messages sent by event type
    pub static ref MESSAGES_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_messages_sent_total", METRIC_PREFIX),
        "Total messages sent",
        &["event"]
    ).unwrap();

    /// Messages that failed to send by event type
    pub static ref MESSAGES_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_messages_failed_total", METRIC_PREFIX),
        "Total messages that failed to send",
        &["event"]
    ).unwrap();

    /// Send latency
    pub static ref MESSAGE_SEND_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_message_send_latency_seconds", METRIC_PREFIX),
        "Message send latency in seconds",
        &["event"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // lazy_static registers on first access
        SESSION_READY.set(0);

        let output = encode_metrics().unwrap();
        assert!(output.contains("relay_session_ready"));
    }

    #[test]
    fn test_message_metrics() {
        MESSAGES_SENT_TOTAL.with_label_values(&["lead_notification"]).inc();
        MESSAGES_FAILED_TOTAL.with_label_values(&["luiss_lead"]).inc();
        MESSAGE_SEND_LATENCY
            .with_label_values(&["lead_notification"])
            .observe(0.2);
        // Just verify no panics
    }
}
