//! HTTP route definitions.

mod health;
mod state;
mod weeks;
mod ws;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(state::routes())
        .merge(weeks::routes())
        .merge(ws::routes())
}
