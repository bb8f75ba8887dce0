//! Sync handler - merges a client's state into the stored one.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use toto_engine::{merge, recompute_scores, MergeOptions, MergeReport, PoolState, StateSummary};

use crate::db;
use crate::error::{AppError, Result};

/// Request body for a sync.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// The client's local state, tombstones included
    pub state: PoolState,
    /// The client has unsaved settings edits
    #[serde(default)]
    pub prefer_local_settings: bool,
}

/// Response for a sync.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    /// Merged state, still carrying the union of tombstones
    pub state: PoolState,
    pub report: MergeReport,
    /// Counts of what was saved
    pub summary: StateSummary,
}

/// Fetch, merge and save under a per-key lock.
///
/// The stored copy has its tombstones removed: after this save the deleted
/// rows are gone. The client clears its own tombstones once it has the
/// response.
pub async fn handle_sync(pool: &PgPool, key: &str, request: SyncRequest) -> Result<SyncResponse> {
    let mut tx = pool.begin().await?;
    db::lock_key(&mut tx, key).await?;

    let server = match db::load_state(&mut *tx, key).await? {
        Some(stored) => stored.to_pool_state()?,
        None => PoolState::new(),
    };

    let options = MergeOptions {
        prefer_local_settings: request.prefer_local_settings,
    };
    let mut outcome = merge(&server, &request.state, options);

    for week in outcome.state.weeks() {
        recompute_scores(&mut outcome.state, week);
    }

    let persisted = outcome.state.without_tombstones();
    let value = serde_json::to_value(&persisted)
        .map_err(|e| AppError::Internal(format!("failed to encode state: {e}")))?;
    db::save_state(&mut *tx, key, &value).await?;
    tx.commit().await?;

    let report = outcome.report;
    tracing::info!(
        key = %key,
        matches_local_won = report.matches.local_won,
        matches_inserted = report.matches.local_inserted,
        users_local_won = report.users.local_won,
        users_inserted = report.users.local_inserted,
        guesses_local_won = report.guesses.local_won,
        guesses_inserted = report.guesses.local_inserted,
        suppressed = report.suppressed(),
        dropped_malformed = report.dropped_malformed(),
        "Merged and saved state"
    );
    if report.dropped_malformed() > 0 {
        tracing::warn!(
            dropped = report.dropped_malformed(),
            "Dropped records without an identity"
        );
    }

    Ok(SyncResponse {
        summary: persisted.summary(),
        state: outcome.state,
        report,
    })
}
