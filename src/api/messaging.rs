//! Interactive messaging endpoints.
//!
//! Unlike the webhooks these surface session and transport errors to the
//! caller.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::session::{ChatSummary, ConnectTrigger};

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub success: bool,
    pub chat_id: String,
}

#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Normalize a destination into a chat id.
///
/// Ids that already carry a domain (`...@c.us`, `...@g.us`) are kept as is;
/// anything else is treated as a phone number.
pub fn normalize_chat_id(to: &str) -> String {
    if to.contains('@') {
        to.to_string()
    } else {
        let digits: String = to.chars().filter(char::is_ascii_digit).collect();
        format!("{}@c.us", digits)
    }
}

/// Groups whose name contains `query`, case-insensitively
pub fn filter_groups(chats: Vec<ChatSummary>, query: &str) -> Vec<GroupSummary> {
    let query = query.to_lowercase();
    chats
        .into_iter()
        .filter(|chat| {
            chat.is_group
                && chat
                    .name
                    .as_ref()
                    .is_some_and(|name| name.to_lowercase().contains(&query))
        })
        .map(|chat| GroupSummary {
            id: chat.id,
            name: chat.name,
        })
        .collect()
}

/// POST /send
#[tracing::instrument(name = "http.send", skip_all)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>> {
    let (to, message) = match (request.to, request.message) {
        (Some(to), Some(message)) if !to.is_empty() && !message.is_empty() => (to, message),
        _ => {
            return Err(AppError::Validation(
                "Parametri mancanti: to, message".to_string(),
            ))
        }
    };

    let chat_id = normalize_chat_id(&to);
    state.session.send(&chat_id, &message).await?;
    tracing::info!(chat_id = %chat_id, "Direct message sent");

    Ok(Json(SendMessageResponse {
        success: true,
        chat_id,
    }))
}

/// GET /chats
pub async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<ChatSummary>>> {
    Ok(Json(state.session.chats().await?))
}

/// GET /groups/{query}
pub async fn search_groups(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<Vec<GroupSummary>>> {
    let chats = state.session.chats().await?;
    Ok(Json(filter_groups(chats, &query)))
}

/// POST /logout
#[tracing::instrument(name = "http.logout", skip_all)]
pub async fn logout(State(state): State<AppState>) -> Result<Json<ActionResponse>> {
    state.session.logout().await?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Disconnesso con successo".to_string(),
    }))
}

/// POST /reconnect
#[tracing::instrument(name = "http.reconnect", skip_all)]
pub async fn reconnect(State(state): State<AppState>) -> Result<Json<ActionResponse>> {
    state.session.connect(ConnectTrigger::Manual).await?;

    Ok(Json(ActionResponse {
        success: true,
        message: "Riconnessione avviata".to_string(),
    }))
}
