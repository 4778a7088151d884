//! API layer - HTTP endpoint handlers organized by domain.

mod health;
mod messaging;
mod metrics;
mod qr;
mod routes;

// Re-export all handlers for use in server/app.rs
pub use health::{health, stats, HealthResponse, StatsResponse, WhatsappHealthResponse};
pub use messaging::{
    filter_groups, list_chats, logout, normalize_chat_id, reconnect, search_groups, send_message,
    ActionResponse, GroupSummary, SendMessageRequest, SendMessageResponse,
};
pub use metrics::prometheus_metrics;
pub use qr::{qr_base64, qr_image, QrResponse};
pub use routes::api_routes;
