//! OS signal handling.
//!
//! Translates SIGINT/SIGTERM into the internal shutdown signal so the
//! platform's stop request drains sessions instead of killing streams
//! mid-frame.

use std::sync::Arc;

use crate::lifecycle::Shutdown;

/// Spawn the task that waits for a termination signal and triggers shutdown.
pub fn spawn_signal_listener(shutdown: Arc<Shutdown>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("SIGINT received"),
            _ = terminate => tracing::info!("SIGTERM received"),
        }

        shutdown.trigger();
    });
}
