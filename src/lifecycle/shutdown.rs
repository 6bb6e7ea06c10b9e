//! Graceful Shutdown Handler
//!
//! Waits for OS signals and unloads the services of a loader.

use crate::loader::ServiceLoader;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;

/// Unloads services when the process is asked to stop
///
/// # Example
///
/// ```rust,ignore
/// use loadout::lifecycle::ShutdownHandler;
///
/// let loader = Arc::new(Mutex::new(loader));
/// let shutdown_handler = ShutdownHandler::new(Arc::clone(&loader));
///
/// tokio::spawn(async move {
///     shutdown_handler.wait_for_shutdown().await;
///     std::process::exit(0);
/// });
/// ```
pub struct ShutdownHandler {
    loader: Arc<Mutex<ServiceLoader>>,
}

impl ShutdownHandler {
    pub fn new(loader: Arc<Mutex<ServiceLoader>>) -> Self {
        Self { loader }
    }

    /// Wait for SIGTERM or SIGINT, then unload every service
    pub async fn wait_for_shutdown(&self) {
        shutdown_signal().await;
        self.shutdown().await;
    }

    /// Unload immediately
    pub async fn shutdown(&self) {
        tracing::info!("Starting graceful shutdown...");

        let mut loader = self.loader.lock().await;
        match loader.unload_services() {
            Ok(report) if report.failures.is_empty() => {
                tracing::info!("Graceful shutdown complete ({} services)", report.unregistered);
            }
            Ok(report) => {
                tracing::warn!(
                    "Graceful shutdown complete with {} teardown failures",
                    report.failures.len()
                );
            }
            Err(e) => tracing::error!("Error during service unload: {}", e),
        }
    }
}

/// Completes when a shutdown signal is received
///
/// If a signal handler cannot be installed the error is logged and that
/// signal is never reported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
