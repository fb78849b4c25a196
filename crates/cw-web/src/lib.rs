//! WebSocket gateway streaming agent progress to chat clients.

pub mod app;
pub mod health;
pub mod ws;

pub use app::{build_router, AppState};

use std::sync::Arc;

use cw_types::Result;
use tokio::net::TcpListener;
use tracing::info;

/// Serve the gateway on `listener` until `state.shutdown` fires.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    let shutdown = state.shutdown.clone();
    info!(%addr, "Gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    info!("Gateway stopped");
    Ok(())
}
