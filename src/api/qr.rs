//! Pairing code endpoints.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::session::PairingPayload;

#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub qr: String,
}

fn current_pairing(state: &AppState) -> Result<PairingPayload> {
    state.session.current_pairing().ok_or_else(|| {
        let reason = if state.session.current_status().state.is_ready() {
            "Già connesso"
        } else {
            "In attesa di connessione"
        };
        AppError::PairingUnavailable { reason }
    })
}

/// GET /qr - pairing code as a PNG image
pub async fn qr_image(State(state): State<AppState>) -> Result<Response> {
    let png = current_pairing(&state)?.to_png()?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// GET /qr/base64 - pairing code as a PNG data URL
pub async fn qr_base64(State(state): State<AppState>) -> Result<Json<QrResponse>> {
    let qr = current_pairing(&state)?.to_data_url()?;
    Ok(Json(QrResponse { qr }))
}
