//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;
use crate::session::SessionState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub whatsapp: WhatsappHealthResponse,
    pub state: SessionState,
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsappHealthResponse {
    pub ready: bool,
    pub has_qr: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_seconds: u64,
    pub state: SessionState,
    pub recipients: usize,
    pub notifications: DispatcherStatsSnapshot,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.session.current_status();

    Json(HealthResponse {
        status: "ok".to_string(),
        whatsapp: WhatsappHealthResponse {
            ready: status.state == SessionState::Ready,
            has_qr: status.has_pairing_code,
        },
        state: status.state,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        state: state.session.current_status().state,
        recipients: state.dispatcher.directory().len(),
        notifications: state.dispatcher.stats(),
    })
}
