mod http;

pub use http::{
    appointment_booked, lead_notification, lead_prequalified, luiss_lead, AppointmentRequest,
    LeadNotificationRequest, LeadPayload, LeadPrequalifiedRequest, LuissLeadRequest,
    WebhookResponse, WEBHOOK_ACCEPTED, WEBHOOK_FAILED,
};
