//! Request handlers shared by the HTTP routes and the WebSocket loop.

mod leaderboard;
mod state;
mod sync;
mod websocket;

pub use leaderboard::*;
pub use state::*;
pub use sync::*;
pub use websocket::*;
