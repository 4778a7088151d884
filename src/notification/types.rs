use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of inbound business event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new lead was assigned to a partner
    LeadNotification,
    /// A lead's prequalification status changed
    LeadPrequalified,
    /// An appointment was booked for a lead
    AppointmentBooked,
    /// A lead for the Luiss partner (fixed destination)
    LuissLead,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LeadNotification => "lead_notification",
            EventType::LeadPrequalified => "lead_prequalified",
            EventType::AppointmentBooked => "appointment_booked",
            EventType::LuissLead => "luiss_lead",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Person a lead is assigned to ("orientatore")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(default, rename = "nome")]
    pub first_name: Option<String>,
    #[serde(default, rename = "cognome")]
    pub last_name: Option<String>,
}

impl Assignee {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
        }
    }

    /// Full name, only when both parts are present and non-empty
    pub fn full_name(&self) -> Option<String> {
        match (non_empty(&self.first_name), non_empty(&self.last_name)) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            _ => None,
        }
    }
}

/// Lead data as sent by the lead-management platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFields {
    #[serde(default, rename = "nome")]
    pub first_name: String,
    #[serde(default, rename = "cognome")]
    pub last_name: String,
    #[serde(default, rename = "numeroTelefono")]
    pub phone: String,
    #[serde(default, rename = "utmContent")]
    pub utm_content: Option<String>,
    #[serde(default, rename = "utmMedium")]
    pub utm_medium: Option<String>,
    #[serde(default, rename = "corsoInteressato")]
    pub course_of_interest: Option<String>,
    #[serde(default, rename = "corso")]
    pub course: Option<String>,
    #[serde(default, rename = "provincia")]
    pub province: Option<String>,
    #[serde(default, rename = "campagna")]
    pub campaign: Option<String>,
    #[serde(default, rename = "appDate")]
    pub appointment: Option<String>,
    #[serde(default, rename = "orientatore")]
    pub assignee: Option<Assignee>,
}

impl LeadFields {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    /// Assignee display name when both first and last name are set
    pub fn assignee_name(&self) -> Option<String> {
        self.assignee.as_ref().and_then(Assignee::full_name)
    }
}

/// Boolean switches and discriminators carried by an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFlags {
    /// Lead belongs to the Volta institute
    #[serde(default)]
    pub volta: bool,
    /// Lead was moved into prequalification
    #[serde(default)]
    pub prequalification_moved: bool,
    /// New prequalification status (`"SQL"` means qualified)
    #[serde(default)]
    pub new_status: Option<String>,
}

/// Transient per-request event, built from a webhook payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub event_type: EventType,
    /// External recipient id; absent for Luiss leads
    pub recipient_id: Option<String>,
    pub lead: LeadFields,
    pub flags: EventFlags,
}

impl NotificationEvent {
    pub fn lead_notification(
        recipient_id: impl Into<String>,
        lead: LeadFields,
        flags: EventFlags,
    ) -> Self {
        Self {
            event_type: EventType::LeadNotification,
            recipient_id: Some(recipient_id.into()),
            lead,
            flags,
        }
    }

    pub fn lead_prequalified(
        recipient_id: impl Into<String>,
        lead: LeadFields,
        new_status: Option<String>,
    ) -> Self {
        Self {
            event_type: EventType::LeadPrequalified,
            recipient_id: Some(recipient_id.into()),
            lead,
            flags: EventFlags {
                new_status,
                ..Default::default()
            },
        }
    }

    pub fn appointment_booked(recipient_id: impl Into<String>, lead: LeadFields) -> Self {
        Self {
            event_type: EventType::AppointmentBooked,
            recipient_id: Some(recipient_id.into()),
            lead,
            flags: EventFlags::default(),
        }
    }

    pub fn luiss_lead(lead: LeadFields) -> Self {
        Self {
            event_type: EventType::LuissLead,
            recipient_id: None,
            lead,
            flags: EventFlags::default(),
        }
    }

    /// Recipient id as a string slice, empty when absent
    pub fn recipient(&self) -> &str {
        self.recipient_id.as_deref().unwrap_or_default()
    }
}

/// Returns the value only when it is present and not empty
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
