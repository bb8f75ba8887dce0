//! WebSocket handler for live state updates.
//!
//! Serves fetch and sync requests over the socket and tells the other
//! connected clients when the stored state changes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

use super::{fetch_state, handle_sync, SyncRequest};

/// Handle an established WebSocket connection.
///
/// Registers the connection, forwards outgoing messages from its channel,
/// answers incoming messages in order and unregisters on disconnect.
pub async fn handle_websocket_connection(
    socket: WebSocket,
    pool: PgPool,
    state_key: String,
    conn_manager: Arc<ConnectionManager>,
    client: String,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = conn_manager.register(client.clone(), tx);

    tracing::info!(conn_id = %conn_id, client = %client, "WebSocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response =
                    process_message(&text, &pool, &state_key, &conn_manager, &conn_id).await;
                conn_manager.send_to(&conn_id, response);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        client = %client,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Answer one client message.
async fn process_message(
    text: &str,
    pool: &PgPool,
    state_key: &str,
    conn_manager: &ConnectionManager,
    conn_id: &str,
) -> ServerMessage {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            return ServerMessage::error(format!("Invalid message format: {}", e), None);
        }
    };

    match client_msg {
        ClientMessage::Fetch { request_id } => match fetch_state(pool, state_key).await {
            Ok(state) => ServerMessage::State {
                state: Box::new(state),
                request_id,
            },
            Err(e) => ServerMessage::error(e.to_string(), request_id),
        },

        ClientMessage::Sync {
            state,
            prefer_local_settings,
            request_id,
        } => {
            let request = SyncRequest {
                state: *state,
                prefer_local_settings,
            };

            match handle_sync(pool, state_key, request).await {
                Ok(response) => {
                    let sent = conn_manager
                        .broadcast_except(conn_id, ServerMessage::state_changed(response.summary));
                    tracing::debug!(sent_to = sent, "Broadcast state change");

                    ServerMessage::SyncResult {
                        state: Box::new(response.state),
                        report: response.report,
                        request_id,
                    }
                }
                Err(e) => ServerMessage::error(e.to_string(), request_id),
            }
        }

        ClientMessage::Ping => ServerMessage::Pong,
    }
}
