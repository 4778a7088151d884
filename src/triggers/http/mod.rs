//! Webhook triggers from the lead-management platform
//!
//! - New lead notifications
//! - Prequalification outcomes
//! - Booked appointments
//! - Luiss partner leads

mod handlers;
mod models;

pub use handlers::{appointment_booked, lead_notification, lead_prequalified, luiss_lead};

pub use models::{
    AppointmentRequest, LeadNotificationRequest, LeadPayload, LeadPrequalifiedRequest,
    LuissLeadRequest, WebhookResponse, WEBHOOK_ACCEPTED, WEBHOOK_FAILED,
};
