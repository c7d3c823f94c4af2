// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! SQLite persistence (§6.5): embedded migrations, the append-only
//! `events` table, and the persona/project tables C7 links sessions to.
//!
//! Grounded on `other_examples/manifests/jcttech-claude-session-manager`,
//! the closest retrieved reference for this problem domain — adapted
//! from its `postgres` feature to `sqlite` since this is a single
//! embedded binary, not a multi-replica service.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::CoreError;

/// A single row destined for the `events` table.
pub struct NewEvent<'a> {
    pub event_id: &'a str,
    pub terminal_id: &'a str,
    pub persona_id: Option<&'a str>,
    pub project_id: Option<&'a str>,
    pub event_type: &'a str,
    pub tool_name: Option<&'a str>,
    pub payload: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Thin wrapper around a `SqlitePool`. Every query goes through here so
/// call sites never hand-roll SQL against the pool directly.
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (creating if absent) the SQLite file at `path` and run
    /// embedded migrations. Migration failure is `Fatal` per §7: startup
    /// aborts rather than running against an unknown schema.
    pub async fn connect(path: &str) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::new().filename(path).create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await
            .map_err(|e| CoreError::Fatal(format!("failed to open sqlite db at {path}: {e}")))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CoreError::Fatal(format!("migration failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Insert a hook-originated event, deduplicated by `event_id`.
    /// Returns `false` (no error) when the id was already present.
    pub async fn insert_hook_event(&self, event: NewEvent<'_>) -> Result<bool, CoreError> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_id, terminal_id, persona_id, project_id, event_type, tool_name, payload, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(event.event_id)
        .bind(event.terminal_id)
        .bind(event.persona_id)
        .bind(event.project_id)
        .bind(event.event_type)
        .bind(event.tool_name)
        .bind(event.payload)
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::TransientIo(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a reconciler-originated event under a fresh id (the caller
    /// generates one; there is no client-supplied id to dedupe against).
    pub async fn insert_reconciler_event(&self, event: NewEvent<'_>) -> Result<(), CoreError> {
        self.insert_hook_event(event).await?;
        Ok(())
    }

    /// Delete `events` rows older than `cutoff`, strict `<` per §4.10.
    /// Returns the number of rows deleted.
    pub async fn sweep_expired_events(&self, cutoff: DateTime<Utc>) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM events WHERE created_at < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::TransientIo(e.to_string()))?;
        Ok(result.rows_affected())
    }

    /// Upsert a persona row for `external_session_key`, returning its id.
    /// `id` is supplied by the caller (deterministically derived, see
    /// `linking::derive_persona_id`) so this is idempotent under retries.
    pub async fn upsert_persona(&self, id: &str, external_session_key: &str, now: DateTime<Utc>) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO personas (id, external_session_key, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(external_session_key) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(external_session_key)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::TransientIo(e.to_string()))?;
        Ok(())
    }

    /// Upsert a project row for `root_path`, returning its id.
    pub async fn upsert_project(&self, id: &str, root_path: &str, now: DateTime<Utc>) -> Result<(), CoreError> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, root_path, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(root_path) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(root_path)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::TransientIo(e.to_string()))?;
        Ok(())
    }

    /// Look up a project id by root path, if one has already been seeded.
    pub async fn find_project_id(&self, root_path: &str) -> Result<Option<String>, CoreError> {
        let row = sqlx::query("SELECT id FROM projects WHERE root_path = ?1")
            .bind(root_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::TransientIo(e.to_string()))?;
        Ok(row.map(|r| r.get::<String, _>("id")))
    }

    /// Count of rows in the `events` table, for tests and the health
    /// endpoint's debug-level reporting.
    pub async fn event_count(&self) -> Result<i64, CoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| CoreError::TransientIo(e.to_string()))?;
        Ok(row.get("n"))
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
