//! Webhook handlers.
//!
//! Every webhook acknowledges the caller as soon as the event is handed to
//! the dispatcher. Unknown recipients and failed sends never change the
//! response; only a payload that cannot be read yields a 500.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::metrics::WebhookMetrics;
use crate::notification::NotificationEvent;
use crate::server::AppState;

use super::models::{
    AppointmentRequest, LeadNotificationRequest, LeadPrequalifiedRequest, LuissLeadRequest,
    WebhookResponse,
};

fn accept(
    state: &AppState,
    endpoint: &'static str,
    event: Result<NotificationEvent, JsonRejection>,
) -> WebhookResponse {
    WebhookMetrics::record_received(endpoint);

    match event {
        Ok(event) => {
            // Send runs detached; its outcome is logged by the dispatcher
            let _ = state.dispatcher.dispatch(event);
            WebhookResponse::Accepted
        }
        Err(rejection) => {
            tracing::error!(endpoint, error = %rejection.body_text(), "Invalid webhook payload");
            WebhookResponse::Failed
        }
    }
}

/// POST /webhook-lead-ecp-notification
#[tracing::instrument(name = "webhook.lead_notification", skip_all)]
pub async fn lead_notification(
    State(state): State<AppState>,
    payload: Result<Json<LeadNotificationRequest>, JsonRejection>,
) -> WebhookResponse {
    let event = payload.map(|Json(request)| request.into_event());
    accept(&state, "lead_notification", event)
}

/// POST /webhook-lead-ecp-prequalifica
#[tracing::instrument(name = "webhook.lead_prequalified", skip_all)]
pub async fn lead_prequalified(
    State(state): State<AppState>,
    payload: Result<Json<LeadPrequalifiedRequest>, JsonRejection>,
) -> WebhookResponse {
    let event = payload.map(|Json(request)| request.into_event());
    accept(&state, "lead_prequalified", event)
}

/// POST /webhook-appointment-ecp
#[tracing::instrument(name = "webhook.appointment_booked", skip_all)]
pub async fn appointment_booked(
    State(state): State<AppState>,
    payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> WebhookResponse {
    let event = payload.map(|Json(request)| request.into_event());
    accept(&state, "appointment_booked", event)
}

/// POST /webhook-lead-luiss
#[tracing::instrument(name = "webhook.luiss_lead", skip_all)]
pub async fn luiss_lead(
    State(state): State<AppState>,
    payload: Result<Json<LuissLeadRequest>, JsonRejection>,
) -> WebhookResponse {
    let event = payload.map(|Json(request)| request.into_event());
    accept(&state, "luiss_lead", event)
}
