//! # Drawer Repository
//!
//! Stores drawer sessions and their append-only cash event logs.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  drawer_sessions (one row per drawer)                                  │
//! │  ┌──────────┬───────────┬───────────────┬───────────┬─────────┐        │
//! │  │ id       │ drawer_id │ opening_float │ closed_at │ version │        │
//! │  └────┬─────┴───────────┴───────────────┴───────────┴─────────┘        │
//! │       │ ON DELETE CASCADE                                               │
//! │       ▼                                                                 │
//! │  drawer_events (INSERT only, never UPDATE)                             │
//! │  ┌──────────┬──────────┬────────────┬────────┬────────┐                │
//! │  │ session  │ sequence │ event_type │ amount │ reason │                │
//! │  └──────────┴──────────┴────────────┴────────┴────────┘                │
//! │               UNIQUE (session_id, sequence)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Optimistic Versioning
//! ```text
//! Writer A (loaded v3)                 Writer B (loaded v3)
//!      │                                    │
//!      ├─ UPDATE … SET version = 4          │
//!      │  WHERE id = ? AND version = 3 ✓    │
//!      ├─ INSERT event seq 3                │
//!      ├─ COMMIT                            │
//!      │                                    ├─ UPDATE … WHERE version = 3 ✗
//!      │                                    └─ VersionConflict → reload
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::sync::{self, SyncOutboxEntry, DRAWER_SESSION_ENTITY};
use till_core::{CashEvent, CashEventType, DrawerSession, DrawerSummary};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct SessionRow {
    id: String,
    drawer_id: String,
    opening_float_cents: i64,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    actual_cash_cents: Option<i64>,
    over_short_cents: Option<i64>,
    version: i64,
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: String,
    session_id: String,
    sequence: i64,
    event_type: CashEventType,
    amount_cents: i64,
    reason: String,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for CashEvent {
    fn from(row: EventRow) -> Self {
        CashEvent {
            id: row.id,
            session_id: row.session_id,
            sequence: row.sequence,
            event_type: row.event_type,
            amount_cents: row.amount_cents,
            reason: row.reason,
            created_at: row.created_at,
        }
    }
}

/// Version and close state of a stored session, for diagnosing a
/// rejected conditional update.
#[derive(Debug, FromRow)]
struct SessionState {
    version: i64,
    closed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for drawer sessions and cash events.
#[derive(Debug, Clone)]
pub struct DrawerRepository {
    pool: SqlitePool,
}

impl DrawerRepository {
    /// Creates a new DrawerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DrawerRepository { pool }
    }

    /// Loads the drawer's current session with its ordered event log.
    ///
    /// ## Returns
    /// * `Ok(None)` - Drawer has no session (never opened, or cleared)
    /// * `Err(DbError::Corrupt)` - Stored rows fail session invariants
    pub async fn load_current(&self, drawer_id: &str) -> DbResult<Option<DrawerSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT
                id, drawer_id, opening_float_cents, opened_at,
                closed_at, actual_cash_cents, over_short_cents, version
            FROM drawer_sessions
            WHERE drawer_id = ?1
            "#,
        )
        .bind(drawer_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let events = self.get_events(&row.id).await?;

        debug!(
            drawer_id = %drawer_id,
            session_id = %row.id,
            events = events.len(),
            version = row.version,
            "Loaded drawer session"
        );

        let session = DrawerSession::restore(
            row.id,
            row.drawer_id,
            row.opening_float_cents,
            events,
            row.opened_at,
            row.closed_at,
            row.actual_cash_cents,
            row.over_short_cents,
            row.version,
        )?;

        Ok(Some(session))
    }

    /// Gets a session's events ordered by sequence.
    pub async fn get_events(&self, session_id: &str) -> DbResult<Vec<CashEvent>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, sequence, event_type, amount_cents, reason, created_at
            FROM drawer_events
            WHERE session_id = ?1
            ORDER BY sequence ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CashEvent::from).collect())
    }

    /// Stores a freshly opened session, replacing whatever the drawer had.
    ///
    /// The old session row and (by cascade) its events are removed in the
    /// same transaction as the insert.
    pub async fn start_session(&self, session: &DrawerSession) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let replaced = sqlx::query("DELETE FROM drawer_sessions WHERE drawer_id = ?1")
            .bind(&session.drawer_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO drawer_sessions (
                id, drawer_id, opening_float_cents, opened_at,
                closed_at, actual_cash_cents, over_short_cents, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&session.id)
        .bind(&session.drawer_id)
        .bind(session.opening_float_cents)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .bind(session.actual_cash_cents)
        .bind(session.over_short_cents)
        .bind(session.version)
        .execute(&mut *tx)
        .await?;

        for event in session.events() {
            insert_event(&mut *tx, event).await?;
        }

        tx.commit().await?;

        info!(
            drawer_id = %session.drawer_id,
            session_id = %session.id,
            opening_float = session.opening_float_cents,
            replaced = replaced > 0,
            "Session stored"
        );

        Ok(())
    }

    /// Appends one event to an open session.
    ///
    /// ## Arguments
    /// * `event` - The event produced by `CashDrawer::add_event`
    /// * `expected_version` - Session version the caller loaded before appending
    ///
    /// ## Errors
    /// * `VersionConflict` - Stored version differs from `expected_version`
    /// * `SessionClosed` - Session was closed in storage
    /// * `NotFound` - Session was cleared
    pub async fn append_event(&self, event: &CashEvent, expected_version: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        claim_version(&mut *tx, &event.session_id, expected_version, None).await?;
        insert_event(&mut *tx, event).await?;

        tx.commit().await?;

        debug!(
            session_id = %event.session_id,
            sequence = event.sequence,
            event_type = %event.event_type,
            amount = event.amount_cents,
            "Event appended"
        );

        Ok(())
    }

    /// Writes the close columns and queues the session summary for sync.
    ///
    /// ## What This Does
    /// ```text
    /// ┌──────────────────── SINGLE TRANSACTION ────────────────────┐
    /// │ 1. UPDATE drawer_sessions SET closed_at, actual, over_short │
    /// │    WHERE version = expected AND closed_at IS NULL           │
    /// │ 2. INSERT INTO sync_outbox ('DRAWER_SESSION', summary JSON) │
    /// └─────────────────────────────────────────────────────────────┘
    /// ```
    pub async fn close_session(
        &self,
        session: &DrawerSession,
        expected_version: i64,
    ) -> DbResult<SyncOutboxEntry> {
        let (closed_at, actual, over_short) = match (
            session.closed_at,
            session.actual_cash_cents,
            session.over_short_cents,
        ) {
            (Some(closed_at), Some(actual), Some(over_short)) => (closed_at, actual, over_short),
            _ => {
                return Err(DbError::Internal(format!(
                    "session {} has not been closed",
                    session.id
                )))
            }
        };

        let payload = serde_json::to_string(&DrawerSummary::of(session))?;

        let mut tx = self.pool.begin().await?;

        claim_version(
            &mut *tx,
            &session.id,
            expected_version,
            Some((closed_at, actual, over_short)),
        )
        .await?;

        let entry = SyncOutboxEntry::new(DRAWER_SESSION_ENTITY, &session.id, payload);
        sync::insert_entry(&mut *tx, &entry).await?;

        tx.commit().await?;

        info!(
            drawer_id = %session.drawer_id,
            session_id = %session.id,
            actual_cash = actual,
            over_short,
            "Session closed and queued for sync"
        );

        Ok(entry)
    }

    /// Id and version of the drawer's stored session, if any.
    ///
    /// Lets a cache holder check whether its copy is still current without
    /// reloading the event log.
    pub async fn stored_version(&self, drawer_id: &str) -> DbResult<Option<(String, i64)>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT id, version FROM drawer_sessions WHERE drawer_id = ?1")
                .bind(drawer_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row)
    }

    /// Removes a session and its events, if it is still at `expected_version`.
    ///
    /// Open and closed sessions can both be removed.
    ///
    /// ## Errors
    /// * `VersionConflict` - Session changed since the caller loaded it
    /// * `NotFound` - Session was already removed or replaced
    pub async fn delete_session(&self, session_id: &str, expected_version: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM drawer_sessions WHERE id = ?1 AND version = ?2")
            .bind(session_id)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            let stored: Option<i64> =
                sqlx::query_scalar("SELECT version FROM drawer_sessions WHERE id = ?1")
                    .bind(session_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match stored {
                None => DbError::not_found("Session", session_id),
                Some(_) => DbError::version_conflict(session_id, expected_version),
            });
        }

        tx.commit().await?;

        debug!(session_id = %session_id, expected_version, "Session deleted");

        Ok(())
    }

    /// Lists drawers that have a stored session, sorted by id.
    pub async fn list_drawer_ids(&self) -> DbResult<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT drawer_id FROM drawer_sessions ORDER BY drawer_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Bumps the session version if it still equals `expected_version` and
/// the session is open, optionally writing the close columns.
///
/// On a miss the stored row is re-read to report why.
async fn claim_version(
    conn: &mut SqliteConnection,
    session_id: &str,
    expected_version: i64,
    close: Option<(DateTime<Utc>, i64, i64)>,
) -> DbResult<()> {
    let (closed_at, actual, over_short) = match close {
        Some((closed_at, actual, over_short)) => (Some(closed_at), Some(actual), Some(over_short)),
        None => (None, None, None),
    };

    let updated = sqlx::query(
        r#"
        UPDATE drawer_sessions SET
            version = version + 1,
            closed_at = COALESCE(?3, closed_at),
            actual_cash_cents = COALESCE(?4, actual_cash_cents),
            over_short_cents = COALESCE(?5, over_short_cents)
        WHERE id = ?1 AND version = ?2 AND closed_at IS NULL
        "#,
    )
    .bind(session_id)
    .bind(expected_version)
    .bind(closed_at)
    .bind(actual)
    .bind(over_short)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 1 {
        return Ok(());
    }

    let state: Option<SessionState> =
        sqlx::query_as("SELECT version, closed_at FROM drawer_sessions WHERE id = ?1")
            .bind(session_id)
            .fetch_optional(&mut *conn)
            .await?;

    Err(match state {
        None => DbError::not_found("Session", session_id),
        Some(state) if state.version != expected_version => {
            debug!(
                session_id = %session_id,
                expected_version,
                stored_version = state.version,
                "Version conflict"
            );
            DbError::version_conflict(session_id, expected_version)
        }
        Some(state) if state.closed_at.is_some() => DbError::SessionClosed {
            session_id: session_id.to_string(),
        },
        Some(_) => DbError::version_conflict(session_id, expected_version),
    })
}

async fn insert_event(conn: &mut SqliteConnection, event: &CashEvent) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO drawer_events (
            id, session_id, sequence, event_type, amount_cents, reason, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&event.id)
    .bind(&event.session_id)
    .bind(event.sequence)
    .bind(event.event_type)
    .bind(event.amount_cents)
    .bind(&event.reason)
    .bind(event.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
