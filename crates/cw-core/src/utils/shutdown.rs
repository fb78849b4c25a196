use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Graceful shutdown handler using tokio broadcast channel.
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<()>,
    is_shutting_down: AtomicBool,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx: tx,
            is_shutting_down: AtomicBool::new(false),
        }
    }

    /// Check if shutdown has been requested.
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Relaxed)
    }

    /// Subscribe to shutdown signal. Returns a receiver that completes when shutdown is requested.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutting_down() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Request graceful shutdown.
    pub fn request_shutdown(&self) {
        if !self.is_shutting_down.swap(true, Ordering::Relaxed) {
            info!("Shutdown requested, closing sessions...");
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Wait for SIGINT / SIGTERM, then request shutdown.
    pub async fn wait_for_signal(&self) {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => info!("Received SIGINT"),
                        _ = sigterm.recv() => info!("Received SIGTERM"),
                    }
                }
                _ => {
                    warn!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C");
            }
        }
        self.request_shutdown();
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
