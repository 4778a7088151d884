//! Notification events and their dispatching.
//!
//! An inbound webhook becomes a [`NotificationEvent`]; the
//! [`NotificationDispatcher`] resolves its destination, renders the text and
//! hands it to the session manager on a detached task.

mod dispatcher;
mod types;

pub use dispatcher::{
    DispatcherStats, DispatcherStatsSnapshot, NotificationDispatcher, OutboundMessage,
};
pub(crate) use types::non_empty;
pub use types::{Assignee, EventFlags, EventType, LeadFields, NotificationEvent};
