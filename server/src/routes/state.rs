//! State endpoint routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use toto_engine::PoolState;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{fetch_state, handle_sync, SyncRequest, SyncResponse};
use crate::websocket::ServerMessage;
use crate::AppState;

/// Create state routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/state", get(fetch_handler))
        .route("/sync", post(sync_handler))
}

/// GET /state - The stored pool state.
async fn fetch_handler(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<PoolState>> {
    let pool_state = fetch_state(&state.pool, &state.config.state_key).await?;
    Ok(Json(pool_state))
}

/// POST /sync - Merge a client state into the stored one.
async fn sync_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncResponse>> {
    let response = handle_sync(&state.pool, &state.config.state_key, request).await?;

    let sent = state
        .conn_manager
        .broadcast_all(ServerMessage::state_changed(response.summary));
    tracing::debug!(sent_to = sent, "Broadcast state change");

    Ok(Json(response))
}
