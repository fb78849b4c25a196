use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET /health: liveness probe with the live session count.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len().await,
    }))
}
