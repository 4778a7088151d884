use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::session::{PairingError, SessionError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not ready")]
    NotReady,

    #[error("No active session")]
    NoSession,

    /// Pairing code requested while none is available
    #[error("Pairing code unavailable: {reason}")]
    PairingUnavailable { reason: &'static str },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Pairing image error: {0}")]
    Pairing(#[from] PairingError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotReady => AppError::NotReady,
            SessionError::NoSession => AppError::NoSession,
            SessionError::Transport(e) => AppError::Transport(e.to_string()),
            SessionError::Closed => AppError::Internal(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

/// Client-facing message, masked in production
fn masked(detail: String, public: &str) -> String {
    if is_production() {
        public.to_string()
    } else {
        detail
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut reason = None;
        let (status, code, client_message, log_message) = match &self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                msg.clone(),
            ),
            AppError::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                "NOT_READY",
                "WhatsApp non connesso".to_string(),
                self.to_string(),
            ),
            AppError::NoSession => (
                StatusCode::BAD_REQUEST,
                "NO_SESSION",
                "Client non inizializzato".to_string(),
                self.to_string(),
            ),
            AppError::PairingUnavailable { reason: r } => {
                reason = Some(r.to_string());
                (
                    StatusCode::NOT_FOUND,
                    "QR_UNAVAILABLE",
                    "QR non disponibile".to_string(),
                    self.to_string(),
                )
            }
            AppError::Transport(e) => {
                let client_msg = masked(e.clone(), "Transport error");
                (StatusCode::INTERNAL_SERVER_ERROR, "TRANSPORT_ERROR", client_msg, e.clone())
            }
            AppError::Pairing(e) => {
                let log_msg = e.to_string();
                let client_msg = masked(log_msg.clone(), "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "PAIRING_ERROR", client_msg, log_msg)
            }
            AppError::Internal(e) => {
                let log_msg = e.clone();
                let client_msg = masked(log_msg.clone(), "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", client_msg, log_msg)
            }
        };

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
                reason,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
