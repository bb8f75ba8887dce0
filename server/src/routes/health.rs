//! Liveness endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// `/health` body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Row key the pool is stored under
    pub state_key: String,
    pub auth_required: bool,
    /// Open WebSocket connections
    pub connections: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

// Does not touch the database.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        state_key: state.config.state_key.clone(),
        auth_required: state.config.auth_secret.is_some(),
        connections: state.conn_manager.connection_count(),
    })
}

async fn root() -> &'static str {
    "Toto State Server"
}
