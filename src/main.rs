use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use lead_notification_relay::config::Settings;
use lead_notification_relay::server::{create_app, AppState};
use lead_notification_relay::session::{
    BridgeTransportFactory, ConnectTrigger, LocalCredentialStore, SessionManager,
};
use lead_notification_relay::shutdown::{wait_for_shutdown, ShutdownReason};
use lead_notification_relay::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    let telemetry = init_telemetry(&settings.otel)?;
    tracing::info!(run_mode = %std::env::var("RUN_MODE").unwrap_or_default(), "Configuration loaded");

    // Subscribe before anything can request shutdown
    let (shutdown_tx, internal_rx) = broadcast::channel(4);
    let mut server_shutdown = shutdown_tx.subscribe();
    let shutdown_handle = tokio::spawn(wait_for_shutdown(shutdown_tx.clone(), internal_rx));

    // Start the session manager
    let factory = Arc::new(BridgeTransportFactory::new(&settings.session));
    let credentials = Arc::new(LocalCredentialStore::new(
        &settings.session.data_path,
        &settings.session.client_id,
    ));
    let (session, session_handle) = SessionManager::spawn(
        settings.session.clone(),
        factory,
        credentials,
        shutdown_tx.clone(),
    );

    // Create application state
    let state = AppState::new(settings.clone(), session.clone())?;
    tracing::info!("Application state initialized");

    session.connect(ConnectTrigger::Boot).await?;

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.recv().await;
        })
        .await?;

    // Wait for the session task to release the transport
    tracing::info!("Waiting for session manager to finish...");
    let _ = session_handle.await;

    let reason = shutdown_handle.await.unwrap_or(ShutdownReason::Fatal);
    tracing::info!(?reason, "Server shutdown complete");

    if reason == ShutdownReason::Fatal {
        drop(telemetry);
        std::process::exit(reason.exit_code());
    }
    Ok(())
}
