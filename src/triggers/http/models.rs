//! Webhook payloads sent by the lead-management platform

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::notification::{Assignee, EventFlags, LeadFields, NotificationEvent};

pub const WEBHOOK_ACCEPTED: &str = "Messaggi inviati con successo agli ECP.";
pub const WEBHOOK_FAILED: &str = "Errore durante l'invio dei messaggi.";

/// Lead object as found under `leads`
#[derive(Debug, Clone, Deserialize)]
pub struct LeadPayload {
    #[serde(flatten)]
    pub fields: LeadFields,
    /// Lead was moved into prequalification
    #[serde(default, rename = "prequalificaSpostato")]
    pub prequalification_moved: bool,
}

/// Fill the lead's assignee from the top-level `orientatore` when the lead has none
fn with_assignee(mut lead: LeadFields, assignee: Option<Assignee>) -> LeadFields {
    if lead.assignee.is_none() {
        lead.assignee = assignee;
    }
    lead
}

/// POST /webhook-lead-ecp-notification
#[derive(Debug, Clone, Deserialize)]
pub struct LeadNotificationRequest {
    #[serde(default, rename = "ecpId", alias = "recipientId")]
    pub ecp_id: String,
    pub leads: LeadPayload,
    #[serde(default)]
    pub volta: bool,
    #[serde(default)]
    pub orientatore: Option<Assignee>,
}

impl LeadNotificationRequest {
    pub fn into_event(self) -> NotificationEvent {
        let flags = EventFlags {
            volta: self.volta,
            prequalification_moved: self.leads.prequalification_moved,
            new_status: None,
        };
        NotificationEvent::lead_notification(
            self.ecp_id,
            with_assignee(self.leads.fields, self.orientatore),
            flags,
        )
    }
}

/// POST /webhook-lead-ecp-prequalifica
#[derive(Debug, Clone, Deserialize)]
pub struct LeadPrequalifiedRequest {
    #[serde(default, rename = "ecpId", alias = "recipientId")]
    pub ecp_id: String,
    pub leads: LeadPayload,
    #[serde(default, rename = "newStatus")]
    pub new_status: Option<String>,
    #[serde(default)]
    pub orientatore: Option<Assignee>,
}

impl LeadPrequalifiedRequest {
    pub fn into_event(self) -> NotificationEvent {
        NotificationEvent::lead_prequalified(
            self.ecp_id,
            with_assignee(self.leads.fields, self.orientatore),
            self.new_status,
        )
    }
}

/// POST /webhook-appointment-ecp
#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentRequest {
    #[serde(default, rename = "ecpId", alias = "recipientId")]
    pub ecp_id: String,
    pub leads: LeadPayload,
}

impl AppointmentRequest {
    pub fn into_event(self) -> NotificationEvent {
        NotificationEvent::appointment_booked(self.ecp_id, self.leads.fields)
    }
}

/// POST /webhook-lead-luiss
#[derive(Debug, Clone, Deserialize)]
pub struct LuissLeadRequest {
    pub leads: LeadPayload,
}

impl LuissLeadRequest {
    pub fn into_event(self) -> NotificationEvent {
        NotificationEvent::luiss_lead(self.leads.fields)
    }
}

/// Plain-text webhook acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResponse {
    Accepted,
    Failed,
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            WebhookResponse::Accepted => (StatusCode::OK, WEBHOOK_ACCEPTED),
            WebhookResponse::Failed => (StatusCode::INTERNAL_SERVER_ERROR, WEBHOOK_FAILED),
        };
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::EventType;

    #[test]
    fn test_lead_notification_wire_names() {
        let raw = r#"{
            "ecpId": "68f8ae7dccb51d3308fea01a",
            "leads": {
                "nome": "Mario",
                "cognome": "Rossi",
                "numeroTelefono": "3331234567",
                "campagna": "Autunno",
                "prequalificaSpostato": true
            },
            "volta": true,
            "orientatore": { "nome": "Anna", "cognome": "Bianchi" }
        }"#;

        let event = serde_json::from_str::<LeadNotificationRequest>(raw)
            .unwrap()
            .into_event();

        assert_eq!(event.event_type, EventType::LeadNotification);
        assert_eq!(event.recipient(), "68f8ae7dccb51d3308fea01a");
        assert_eq!(event.lead.first_name, "Mario");
        assert_eq!(event.lead.campaign.as_deref(), Some("Autunno"));
        assert!(event.flags.volta);
        assert!(event.flags.prequalification_moved);
        assert_eq!(event.lead.assignee_name().as_deref(), Some("Anna Bianchi"));
    }

    #[test]
    fn test_recipient_id_alias() {
        let raw = r#"{ "recipientId": "abc", "leads": { "nome": "A" } }"#;
        let event = serde_json::from_str::<AppointmentRequest>(raw)
            .unwrap()
            .into_event();
        assert_eq!(event.recipient(), "abc");
    }

    #[test]
    fn test_lead_assignee_wins_over_top_level() {
        let raw = r#"{
            "ecpId": "x",
            "newStatus": "SQL",
            "leads": { "orientatore": { "nome": "Luca", "cognome": "Verdi" } },
            "orientatore": { "nome": "Anna", "cognome": "Bianchi" }
        }"#;
        let event = serde_json::from_str::<LeadPrequalifiedRequest>(raw)
            .unwrap()
            .into_event();
        assert_eq!(event.lead.assignee_name().as_deref(), Some("Luca Verdi"));
        assert_eq!(event.flags.new_status.as_deref(), Some("SQL"));
    }

    #[test]
    fn test_luiss_has_no_recipient() {
        let event = serde_json::from_str::<LuissLeadRequest>(r#"{ "leads": {} }"#)
            .unwrap()
            .into_event();
        assert_eq!(event.recipient_id, None);
    }

    #[test]
    fn test_missing_lead_object_is_rejected() {
        let raw = r#"{ "ecpId": "68f8ae7dccb51d3308fea01a", "volta": true }"#;
        assert!(serde_json::from_str::<LeadNotificationRequest>(raw).is_err());
        assert!(serde_json::from_str::<LeadPrequalifiedRequest>(raw).is_err());
        assert!(serde_json::from_str::<AppointmentRequest>(raw).is_err());
        assert!(serde_json::from_str::<LuissLeadRequest>("{}").is_err());
    }
}
