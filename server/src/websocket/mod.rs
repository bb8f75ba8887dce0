//! WebSocket support for live updates.
//!
//! Clients connect via WebSocket to fetch and sync the pool state without
//! polling, and are told when another client has saved a new state.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
