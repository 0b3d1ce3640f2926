//! Durable per-account/per-device key storage backed by SQLite.
//!
//! The account identifier is the namespace root and the device identifier
//! the nested namespace; each entry carries exactly two fields, the key
//! bytes and the last-write timestamp, written as one atomic unit. All
//! serialization of concurrent writers is delegated to the engine's
//! transaction boundaries; readers observe a consistent snapshot. This
//! layer performs no retries; retry policy belongs to the caller.

use keydir_types::{KeydirError, Timestamp};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Transactional key store, cheap to clone.
#[derive(Clone)]
pub struct KeyStore {
    pool: Arc<SqlitePool>,
}

/// Outcome of a conflict-raising creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The account namespace already existed prior to the call.
    Conflict,
}

/// Outcome of an update against an existing account namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The account namespace was never created.
    NotFound,
}

impl KeyStore {
    /// Open or create the database.
    pub async fn open(db_path: &str) -> Result<Self, KeydirError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(&format!("sqlite:{db_path}?mode=rwc"))
            .await
            .map_err(|e| KeydirError::Storage(e.to_string()))?;

        let store = Self {
            pool: Arc::new(pool),
        };
        store.migrate().await?;
        info!(db_path, "key store open");
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), KeydirError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS device_keys (
                user_id TEXT NOT NULL,
                device_id TEXT NOT NULL,
                key BLOB NOT NULL,
                updated INTEGER NOT NULL,
                PRIMARY KEY (user_id, device_id)
            )",
        )
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| KeydirError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Create the first entry under an account namespace, or report that
    /// the namespace already existed before this call.
    pub async fn create_or_conflict(
        &self,
        user_id: &str,
        device_id: &str,
        key: &[u8],
        updated: Timestamp,
    ) -> Result<CreateOutcome, KeydirError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| KeydirError::Storage(e.to_string()))?;

        if namespace_exists(&mut tx, user_id).await? {
            return Ok(CreateOutcome::Conflict);
        }

        sqlx::query(
            "INSERT INTO device_keys (user_id, device_id, key, updated) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(device_id)
        .bind(key)
        .bind(updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| KeydirError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| KeydirError::Storage(e.to_string()))?;
        Ok(CreateOutcome::Created)
    }

    /// Write a device entry under an account namespace that must already
    /// exist.
    pub async fn update(
        &self,
        user_id: &str,
        device_id: &str,
        key: &[u8],
        updated: Timestamp,
    ) -> Result<UpdateOutcome, KeydirError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| KeydirError::Storage(e.to_string()))?;

        if !namespace_exists(&mut tx, user_id).await? {
            return Ok(UpdateOutcome::NotFound);
        }

        sqlx::query(
            "INSERT INTO device_keys (user_id, device_id, key, updated) VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, device_id) DO UPDATE SET key = excluded.key, updated = excluded.updated",
        )
        .bind(user_id)
        .bind(device_id)
        .bind(key)
        .bind(updated)
        .execute(&mut *tx)
        .await
        .map_err(|e| KeydirError::Storage(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| KeydirError::Storage(e.to_string()))?;
        Ok(UpdateOutcome::Updated)
    }

    /// Create or replace a device entry without surfacing conflicts. The
    /// register path uses this; key and timestamp land in one statement so
    /// no reader can observe them torn apart.
    pub async fn upsert(
        &self,
        user_id: &str,
        device_id: &str,
        key: &[u8],
        updated: Timestamp,
    ) -> Result<(), KeydirError> {
        sqlx::query(
            "INSERT INTO device_keys (user_id, device_id, key, updated) VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, device_id) DO UPDATE SET key = excluded.key, updated = excluded.updated",
        )
        .bind(user_id)
        .bind(device_id)
        .bind(key)
        .bind(updated)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| KeydirError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Fetch every device key registered under an account. `None` means the
    /// account namespace was never created.
    pub async fn fetch_all(
        &self,
        user_id: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, KeydirError> {
        let rows: Vec<(String, Vec<u8>)> = sqlx::query_as(
            "SELECT device_id, key FROM device_keys WHERE user_id = ? ORDER BY device_id",
        )
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(|e| KeydirError::Storage(e.to_string()))?;

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows.into_iter().collect()))
    }
}

async fn namespace_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    user_id: &str,
) -> Result<bool, KeydirError> {
    let row: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM device_keys WHERE user_id = ? LIMIT 1")
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| KeydirError::Storage(e.to_string()))?;
    Ok(row.is_some())
}
