use std::sync::Arc;

use axum::{routing::get, Router};
use cw_config::Config;
use cw_core::{AgentRuntime, GracefulShutdown, SessionRegistry};

/// Shared state handed to every handler as `Arc<AppState>`.
pub struct AppState {
    pub config: Config,
    pub registry: SessionRegistry,
    pub agent: Arc<dyn AgentRuntime>,
    pub shutdown: Arc<GracefulShutdown>,
}

impl AppState {
    pub fn new(config: Config, agent: Arc<dyn AgentRuntime>) -> Self {
        Self {
            config,
            registry: SessionRegistry::new(),
            agent,
            shutdown: Arc::new(GracefulShutdown::new()),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::health::health_handler))
        .route(
            "/ws/chat/{session_id}/{datasource_id}",
            get(crate::ws::connection::ws_handler),
        )
        .with_state(state)
}
