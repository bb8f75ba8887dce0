//! Leaderboard handler - ranks a week's guesses against its results.

use serde::Serialize;
use sqlx::PgPool;
use toto_engine::{leaderboard, paid_pot, pot, LeaderboardRow, PoolState, Week};

use super::fetch_state;
use crate::error::{AppError, Result};

/// Response for a weekly leaderboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub week: Week,
    /// Matches in the week that have a result
    pub decided: usize,
    pub rows: Vec<LeaderboardRow>,
    pub pot: u64,
    pub paid_pot: u64,
    pub prize: u64,
}

/// Build the leaderboard of `week` from a state.
pub fn week_leaderboard(state: &PoolState, week: Week) -> Result<LeaderboardResponse> {
    if week == 0 {
        return Err(AppError::BadRequest("week must be 1 or greater".into()));
    }
    if state.matches_for_week(week).next().is_none() {
        return Err(AppError::NotFound(format!("week {week}")));
    }

    Ok(LeaderboardResponse {
        week,
        decided: state
            .matches_for_week(week)
            .filter(|m| m.result.is_decided())
            .count(),
        rows: leaderboard(state, week),
        pot: pot(state, week),
        paid_pot: paid_pot(state, week),
        prize: state.settings().toto_prize,
    })
}

/// Load the stored state and rank `week`.
pub async fn handle_leaderboard(
    pool: &PgPool,
    key: &str,
    week: Week,
) -> Result<LeaderboardResponse> {
    let state = fetch_state(pool, key).await?;
    week_leaderboard(&state, week)
}
