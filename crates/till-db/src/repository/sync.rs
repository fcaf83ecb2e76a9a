//! # Sync Outbox Repository
//!
//! Manages the sync outbox queue for offline-first synchronization.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL OPERATION (close_session)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE drawer_sessions SET closed_at = ?, ...              │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO sync_outbox (entity_type, entity_id, payload)  │   │
//! │  │     VALUES ('DRAWER_SESSION', ?, <summary JSON>)               │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPLOADER (outside this crate)                                         │
//! │  1. get_pending(limit)                                                 │
//! │  2. On success: mark_synced(id)                                        │
//! │     On failure: mark_failed(id, error) → attempts += 1                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Outbox entity type for closed drawer sessions.
pub const DRAWER_SESSION_ENTITY: &str = "DRAWER_SESSION";

/// One queued upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SyncOutboxEntry {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    /// JSON serialization of the entity.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl SyncOutboxEntry {
    /// Builds a fresh, never-attempted entry.
    pub fn new(entity_type: &str, entity_id: &str, payload: String) -> Self {
        SyncOutboxEntry {
            id: Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            payload,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            attempted_at: None,
            synced_at: None,
        }
    }
}

/// Inserts an entry on an existing connection or transaction.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: &SyncOutboxEntry,
) -> DbResult<()> {
    debug!(
        entity_type = %entry.entity_type,
        entity_id = %entry.entity_id,
        "Queuing for sync"
    );

    sqlx::query(
        r#"
        INSERT INTO sync_outbox (
            id, entity_type, entity_id, payload,
            attempts, last_error, created_at, attempted_at, synced_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.payload)
    .bind(entry.attempts)
    .bind(&entry.last_error)
    .bind(entry.created_at)
    .bind(entry.attempted_at)
    .bind(entry.synced_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct SyncOutboxRepository {
    pool: SqlitePool,
}

impl SyncOutboxRepository {
    /// Creates a new SyncOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncOutboxRepository { pool }
    }

    /// Queues an entity for synchronization.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_string(&summary)?;
    /// repo.queue_for_sync(DRAWER_SESSION_ENTITY, &session.id, payload).await?;
    /// ```
    pub async fn queue_for_sync(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: String,
    ) -> DbResult<SyncOutboxEntry> {
        let entry = SyncOutboxEntry::new(entity_type, entity_id, payload);

        let mut conn = self.pool.acquire().await?;
        insert_entry(&mut *conn, &entry).await?;

        Ok(entry)
    }

    /// Gets pending entries, oldest first.
    ///
    /// The uploader's read side; the `report` binary lists them too.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<SyncOutboxEntry>> {
        let entries: Vec<SyncOutboxEntry> = sqlx::query_as(
            r#"
            SELECT
                id, entity_type, entity_id, payload,
                attempts, last_error, created_at, attempted_at, synced_at
            FROM sync_outbox
            WHERE synced_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as successfully synced.
    ///
    /// Called by the uploader once the cloud acknowledged the payload.
    pub async fn mark_synced(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE sync_outbox SET
                synced_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }

        Ok(())
    }

    /// Records a sync failure and bumps the attempt count.
    ///
    /// Called by the uploader; the entry stays pending for the next pass.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        let updated = sqlx::query(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }

        warn!(id = %id, error = %error, "Sync attempt failed");

        Ok(())
    }

    /// Counts pending sync entries.
    pub async fn pending_count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE synced_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> SyncOutboxRepository {
        Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .sync_outbox()
    }

    #[tokio::test]
    async fn test_queue_and_mark_synced() {
        let repo = setup().await;

        let entry = repo
            .queue_for_sync(DRAWER_SESSION_ENTITY, "s-1", "{}".to_string())
            .await
            .unwrap();
        assert_eq!(repo.pending_count().await.unwrap(), 1);

        let pending = repo.get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, entry.id);
        assert_eq!(pending[0].entity_id, "s-1");

        repo.mark_synced(&entry.id).await.unwrap();
        assert_eq!(repo.pending_count().await.unwrap(), 0);
        assert!(repo.get_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_failed_keeps_entry_pending() {
        let repo = setup().await;
        let entry = repo
            .queue_for_sync(DRAWER_SESSION_ENTITY, "s-1", "{}".to_string())
            .await
            .unwrap();

        repo.mark_failed(&entry.id, "offline").await.unwrap();
        repo.mark_failed(&entry.id, "timeout").await.unwrap();

        let pending = repo.get_pending(10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("timeout"));
        assert!(pending[0].attempted_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_entry() {
        let repo = setup().await;
        assert!(matches!(
            repo.mark_synced("nope").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            repo.mark_failed("nope", "x").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_pending_respects_limit() {
        let repo = setup().await;
        for i in 0..3 {
            repo.queue_for_sync(DRAWER_SESSION_ENTITY, &format!("s-{}", i), "{}".to_string())
                .await
                .unwrap();
        }
        assert_eq!(repo.get_pending(2).await.unwrap().len(), 2);
        assert_eq!(repo.pending_count().await.unwrap(), 3);
    }
}
