//! `SQLite`-backed document store
//!
//! Every conditional write is one guarded statement; an empty `RETURNING`
//! result means the guard failed and maps to `CasResult::Conflict`.

use crate::StorageError;
use async_trait::async_trait;
use festify_core::{
    paths, resolve_server_values, CasResult, Clock, DocumentStore, Result, SystemClock,
    Versioned, Write,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

/// Document store persisted in the `documents` table
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Wrap a migrated pool, stamping commits with the system clock
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Wrap a migrated pool, stamping commits with `clock`
    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Open (and migrate) the database at `database_url`
    pub async fn connect(database_url: &str) -> std::result::Result<Self, StorageError> {
        let pool = crate::create_pool(database_url).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Resolve server values and serialize for storage
    fn encode(&self, mut value: Value) -> Result<(Value, String)> {
        resolve_server_values(&mut value, self.clock.now_millis());
        let body = serde_json::to_string(&value)?;
        Ok((value, body))
    }
}

fn decode(path: &str, body: &str, version: i64) -> Result<Versioned<Value>> {
    let data = serde_json::from_str(body)
        .map_err(|e| StorageError::corrupt(path, e.to_string()))?;
    Ok(Versioned {
        data,
        version: version as u64,
    })
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, path: &str) -> Result<Option<Versioned<Value>>> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT body, version FROM documents WHERE path = ? AND body IS NOT NULL",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(body, version)| decode(path, &body, version))
            .transpose()
    }

    async fn children(&self, path: &str) -> Result<Vec<(String, Versioned<Value>)>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT path, body, version FROM documents
             WHERE parent = ? AND body IS NOT NULL
             ORDER BY path",
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(child, body, version)| {
                let snapshot = decode(&child, &body, version)?;
                Ok((paths::key(&child).to_string(), snapshot))
            })
            .collect()
    }

    async fn compare_and_swap(
        &self,
        path: &str,
        expected_version: Option<u64>,
        write: Write,
    ) -> Result<CasResult> {
        let now = self.clock.now_millis();

        let committed = match (expected_version, write) {
            // Create: only over a missing row or a tombstone
            (None, Write::Put(value)) => {
                let (value, body) = self.encode(value)?;
                let version: Option<i64> = sqlx::query_scalar(
                    "INSERT INTO documents (path, parent, body, version, updated_at)
                     VALUES (?, ?, ?, 1, ?)
                     ON CONFLICT(path) DO UPDATE SET
                        body = excluded.body,
                        version = documents.version + 1,
                        updated_at = excluded.updated_at
                     WHERE documents.body IS NULL
                     RETURNING version",
                )
                .bind(path)
                .bind(paths::parent(path))
                .bind(body)
                .bind(now)
                .fetch_optional(&self.pool)
                .await?;

                version.map(|version| {
                    Some(Versioned {
                        data: value,
                        version: version as u64,
                    })
                })
            }
            // Deleting something that must not exist is a no-op commit
            (None, Write::Delete) => {
                let exists = self.get(path).await?.is_some();
                if exists {
                    None
                } else {
                    Some(None)
                }
            }
            (Some(expected), Write::Put(value)) => {
                let (value, body) = self.encode(value)?;
                let version: Option<i64> = sqlx::query_scalar(
                    "UPDATE documents SET body = ?, version = version + 1, updated_at = ?
                     WHERE path = ? AND version = ? AND body IS NOT NULL
                     RETURNING version",
                )
                .bind(body)
                .bind(now)
                .bind(path)
                .bind(expected as i64)
                .fetch_optional(&self.pool)
                .await?;

                version.map(|version| {
                    Some(Versioned {
                        data: value,
                        version: version as u64,
                    })
                })
            }
            (Some(expected), Write::Delete) => {
                let result = sqlx::query(
                    "UPDATE documents SET body = NULL, version = version + 1, updated_at = ?
                     WHERE path = ? AND version = ? AND body IS NOT NULL",
                )
                .bind(now)
                .bind(path)
                .bind(expected as i64)
                .execute(&self.pool)
                .await?;

                (result.rows_affected() > 0).then_some(None)
            }
        };

        match committed {
            Some(snapshot) => Ok(CasResult::Committed(snapshot)),
            None => {
                debug!(path, ?expected_version, "compare-and-swap lost the race");
                Ok(CasResult::Conflict)
            }
        }
    }

    async fn put(&self, path: &str, value: Value) -> Result<Versioned<Value>> {
        let (value, body) = self.encode(value)?;
        let version: i64 = sqlx::query_scalar(
            "INSERT INTO documents (path, parent, body, version, updated_at)
             VALUES (?, ?, ?, 1, ?)
             ON CONFLICT(path) DO UPDATE SET
                body = excluded.body,
                version = documents.version + 1,
                updated_at = excluded.updated_at
             RETURNING version",
        )
        .bind(path)
        .bind(paths::parent(path))
        .bind(body)
        .bind(self.clock.now_millis())
        .fetch_one(&self.pool)
        .await?;

        Ok(Versioned {
            data: value,
            version: version as u64,
        })
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET body = NULL, version = version + 1, updated_at = ?
             WHERE path = ? AND body IS NOT NULL",
        )
        .bind(self.clock.now_millis())
        .bind(path)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
