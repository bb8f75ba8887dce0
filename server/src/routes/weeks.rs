//! Per-week routes.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use toto_engine::Week;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_leaderboard, LeaderboardResponse};
use crate::AppState;

/// Create week routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/weeks/{week}/leaderboard", get(leaderboard_handler))
}

/// GET /weeks/{week}/leaderboard
async fn leaderboard_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(week): Path<Week>,
) -> Result<Json<LeaderboardResponse>> {
    let response = handle_leaderboard(&state.pool, &state.config.state_key, week).await?;
    Ok(Json(response))
}
