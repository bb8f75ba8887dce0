//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded. Message tags and envelope fields use
//! snake_case; the pool state inside keeps its camelCase shape.

use serde::{Deserialize, Serialize};
use toto_engine::{MergeReport, PoolState, StateSummary};

/// Messages sent from client to server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request the stored state.
    Fetch {
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Merge the client's state into the stored one and save the result.
    Sync {
        state: Box<PoolState>,
        /// Let the client's settings win this merge
        #[serde(default)]
        prefer_local_settings: bool,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to a fetch.
    State {
        state: Box<PoolState>,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to a sync: the merged state, tombstones included.
    SyncResult {
        state: Box<PoolState>,
        report: MergeReport,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Another client saved a new state; fetch it.
    StateChanged {
        summary: StateSummary,
        /// Milliseconds since epoch
        updated_at: i64,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        /// Error description
        message: String,
        /// Request ID from the original request (if applicable)
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            request_id,
        }
    }

    /// Create a state_changed notification stamped with the current time.
    pub fn state_changed(summary: StateSummary) -> Self {
        ServerMessage::StateChanged {
            summary,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
