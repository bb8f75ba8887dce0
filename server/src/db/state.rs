//! The `kv_store` table: one JSON document per key.

use sqlx::{PgConnection, PgExecutor, Row};
use toto_engine::PoolState;

/// A stored state row.
#[derive(Debug)]
pub struct StoredState {
    pub value: serde_json::Value,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredState {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredState {
            value: row.try_get("value")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredState {
    /// Decode the stored document.
    pub fn to_pool_state(&self) -> Result<PoolState, toto_engine::Error> {
        serde_json::from_value(self.value.clone())
            .map_err(|e| toto_engine::Error::Storage(format!("stored state does not parse: {e}")))
    }
}

/// Load the document stored under `key`.
pub async fn load_state<'e, E>(executor: E, key: &str) -> Result<Option<StoredState>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, StoredState>("SELECT value, updated_at FROM kv_store WHERE key = $1")
        .bind(key)
        .fetch_optional(executor)
        .await
}

/// Replace the document stored under `key`. The last write wins.
pub async fn save_state<'e, E>(
    executor: E,
    key: &str,
    value: &serde_json::Value,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO kv_store (key, value, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (key) DO UPDATE
        SET value = EXCLUDED.value, updated_at = NOW()
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}

/// Serialize read-merge-write cycles on `key` until the transaction ends.
pub async fn lock_key(conn: &mut PgConnection, key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(key)
        .execute(conn)
        .await?;
    Ok(())
}
