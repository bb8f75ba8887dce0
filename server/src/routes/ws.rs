//! WebSocket upgrade route.

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::handlers::handle_websocket_connection;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Label used in logs
    #[serde(default)]
    pub client: Option<String>,
}

/// Create WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws - Upgrade to a WebSocket connection.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<WsQuery>,
) -> Response {
    let client = query.client.unwrap_or_else(|| "anonymous".to_string());
    let AppState {
        pool,
        config,
        conn_manager,
    } = state;
    let state_key = config.state_key.clone();

    ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, pool, state_key, conn_manager, client)
    })
}
