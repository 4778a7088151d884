//! Process shutdown coordination.
//!
//! One broadcast channel carries the shutdown signal. It fires on SIGINT or
//! SIGTERM, or when a component sends on it directly (the session manager
//! does so when authentication fails under the `terminate` policy). The
//! HTTP server drains, the pending reconnect is cancelled and the transport
//! is released.

use tokio::signal;
use tokio::sync::broadcast;

/// What ended the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM
    Signal,
    /// A component requested shutdown; the process should exit non-zero
    Fatal,
}

impl ShutdownReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::Signal => 0,
            ShutdownReason::Fatal => 1,
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}

/// Wait for a signal or an internal request, then broadcast shutdown.
///
/// `internal` must be subscribed from `shutdown_tx` before any component can
/// send on it.
pub async fn wait_for_shutdown(
    shutdown_tx: broadcast::Sender<()>,
    mut internal: broadcast::Receiver<()>,
) -> ShutdownReason {
    let reason = tokio::select! {
        _ = ctrl_c() => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
            ShutdownReason::Signal
        }
        _ = terminate() => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
            ShutdownReason::Signal
        }
        _ = internal.recv() => {
            tracing::warn!("Shutdown requested internally");
            ShutdownReason::Fatal
        }
    };

    let _ = shutdown_tx.send(());
    reason
}
