use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::directory::{DirectoryError, RecipientDirectory};
use crate::notification::NotificationDispatcher;
use crate::session::SessionManager;
use crate::template::{DateFormatter, RoutingSets, TemplateResolver};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub session: SessionManager,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the directory and resolver from settings around a running session
    pub fn new(settings: Settings, session: SessionManager) -> Result<Self, DirectoryError> {
        let directory = Arc::new(RecipientDirectory::new(settings.recipients.clone())?);
        let resolver = TemplateResolver::new(
            RoutingSets::from(&settings.routing),
            DateFormatter::new(settings.templates.appointment_date_mode),
        );

        tracing::info!(
            recipients = directory.len(),
            date_mode = ?settings.templates.appointment_date_mode,
            "Recipient directory loaded"
        );

        Ok(Self::with_dispatcher(
            settings,
            session.clone(),
            NotificationDispatcher::new(directory, resolver, session),
        ))
    }

    pub fn with_dispatcher(
        settings: Settings,
        session: SessionManager,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            session,
            dispatcher: Arc::new(dispatcher),
            start_time: Instant::now(),
        }
    }
}
