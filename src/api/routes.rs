use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;
use crate::triggers::{appointment_booked, lead_notification, lead_prequalified, luiss_lead};

use super::health::{health, stats};
use super::messaging::{list_chats, logout, reconnect, search_groups, send_message};
use super::metrics::prometheus_metrics;
use super::qr::{qr_base64, qr_image};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        // Pairing
        .route("/qr", get(qr_image))
        .route("/qr/base64", get(qr_base64))
        // Session & direct messaging
        .route("/send", post(send_message))
        .route("/chats", get(list_chats))
        .route("/groups/{query}", get(search_groups))
        .route("/logout", post(logout))
        .route("/reconnect", post(reconnect))
        // Lead platform webhooks
        .route("/webhook-lead-ecp-notification", post(lead_notification))
        .route("/webhook-lead-ecp-prequalifica", post(lead_prequalified))
        .route("/webhook-appointment-ecp", post(appointment_booked))
        .route("/webhook-lead-luiss", post(luiss_lead))
}
