//! Fetch handler - reads the stored pool state.

use sqlx::PgPool;
use toto_engine::PoolState;

use crate::db;
use crate::error::Result;

/// Load the stored state, or an empty one if nothing has been saved yet.
pub async fn fetch_state(pool: &PgPool, key: &str) -> Result<PoolState> {
    match db::load_state(pool, key).await? {
        Some(stored) => {
            let state = stored.to_pool_state()?;
            tracing::debug!(
                key = %key,
                updated_at = %stored.updated_at,
                matches = state.matches.len(),
                users = state.users.len(),
                guesses = state.user_guesses.len(),
                "Loaded state"
            );
            Ok(state)
        }
        None => {
            tracing::debug!(key = %key, "No stored state, serving empty pool");
            Ok(PoolState::new())
        }
    }
}
