//! # Drawer Service
//!
//! The operations terminals call, with per-drawer serialization and
//! persistence in front of every state change.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_event("front-1", cash_out, 50.00, "safe drop")                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock slot "front-1"  (other terminals on this drawer wait here)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reload from DB if first use or stored id/version moved               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  next = drawer.clone(); next.add_event(..)   ← validation errors stop  │
//! │       │                                        here, drawer untouched   │
//! │       ▼                                                                 │
//! │  db.append_event(&event, version_before)     ← DB errors stop here,    │
//! │       │                                        drawer untouched         │
//! │       ▼                                                                 │
//! │  *drawer = next                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call compares the cached session id and version with storage, so
//! changes made by another hub are picked up before the cache is trusted. A
//! writer that still races past that check gets a storage conflict; the
//! cached drawer is then dropped and the next call reloads.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::state::DrawerRegistry;
use till_core::validation::validate_drawer_id;
use till_core::{CashDrawer, CashEvent, CashEventType, DrawerStatus, DrawerSummary, Money};
use till_db::{Database, DbError};

// =============================================================================
// Response Types
// =============================================================================

/// Read-only view of one drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawerSnapshot {
    pub drawer_id: String,
    pub status: DrawerStatus,
    /// Expected cash; `None` without a session.
    pub running_balance: Option<Money>,
    pub summary: Option<DrawerSummary>,
    pub events: Vec<CashEvent>,
}

impl From<&CashDrawer> for DrawerSnapshot {
    fn from(drawer: &CashDrawer) -> Self {
        DrawerSnapshot {
            drawer_id: drawer.drawer_id().to_string(),
            status: drawer.status(),
            running_balance: drawer.running_balance(),
            summary: drawer.summary(),
            events: drawer.events().to_vec(),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Drawer operations over the registry and the database.
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct DrawerService {
    db: Database,
    registry: DrawerRegistry,
}

impl DrawerService {
    pub fn new(db: Database) -> Self {
        DrawerService {
            db,
            registry: DrawerRegistry::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Starts a new session, replacing any existing one.
    pub async fn open_drawer(
        &self,
        drawer_id: &str,
        opening_float: Money,
    ) -> ApiResult<DrawerSnapshot> {
        validate_drawer_id(drawer_id)?;
        let slot = self.registry.slot(drawer_id);
        let mut guard = slot.lock().await;
        let drawer = self.loaded(drawer_id, &mut guard).await?;

        let mut next = drawer.clone();
        let session = next.open_drawer(opening_float)?;
        self.db.drawers().start_session(&session).await?;

        info!(
            drawer_id = %drawer_id,
            session_id = %session.id,
            opening_float = %opening_float,
            "Drawer opened"
        );

        *drawer = next;
        Ok(DrawerSnapshot::from(&*drawer))
    }

    /// Records a cash movement.
    pub async fn add_event(
        &self,
        drawer_id: &str,
        event_type: CashEventType,
        amount: Money,
        reason: &str,
    ) -> ApiResult<CashEvent> {
        validate_drawer_id(drawer_id)?;
        let slot = self.registry.slot(drawer_id);
        let mut guard = slot.lock().await;
        let drawer = self.loaded(drawer_id, &mut guard).await?;

        let mut next = drawer.clone();
        let expected_version = current_version(&next);
        let event = next.add_event(event_type, amount, reason)?;

        if let Err(err) = self.db.drawers().append_event(&event, expected_version).await {
            return Err(self.evict_on_conflict(drawer_id, &mut guard, err));
        }

        info!(
            drawer_id = %drawer_id,
            sequence = event.sequence,
            event_type = %event.event_type,
            amount = %event.amount(),
            "Cash event recorded"
        );

        *guard = Some(next);
        Ok(event)
    }

    /// Counts the drawer and freezes the session.
    pub async fn close_drawer(
        &self,
        drawer_id: &str,
        actual_cash: Money,
    ) -> ApiResult<DrawerSnapshot> {
        validate_drawer_id(drawer_id)?;
        let slot = self.registry.slot(drawer_id);
        let mut guard = slot.lock().await;
        let drawer = self.loaded(drawer_id, &mut guard).await?;

        let mut next = drawer.clone();
        let expected_version = current_version(&next);
        let closed = next.close_drawer(actual_cash)?;

        if let Err(err) = self.db.drawers().close_session(&closed, expected_version).await {
            return Err(self.evict_on_conflict(drawer_id, &mut guard, err));
        }

        info!(
            drawer_id = %drawer_id,
            session_id = %closed.id,
            actual_cash = %actual_cash,
            over_short = ?closed.over_short_cents,
            "Drawer closed"
        );

        let snapshot = DrawerSnapshot::from(&next);
        *guard = Some(next);
        Ok(snapshot)
    }

    /// Discards the drawer's session. Returns whether one existed.
    ///
    /// Only the session this hub last saw is removed; one changed or
    /// replaced in the meantime is a conflict.
    pub async fn clear_session(&self, drawer_id: &str) -> ApiResult<bool> {
        validate_drawer_id(drawer_id)?;
        let slot = self.registry.slot(drawer_id);
        let mut guard = slot.lock().await;
        let drawer = self.loaded(drawer_id, &mut guard).await?;

        let mut next = drawer.clone();
        let Some(discarded) = next.clear_session() else {
            return Ok(false);
        };

        if let Err(err) = self
            .db
            .drawers()
            .delete_session(&discarded.id, discarded.version)
            .await
        {
            return Err(self.evict_on_conflict(drawer_id, &mut guard, err));
        }

        debug!(
            drawer_id = %drawer_id,
            session_id = %discarded.id,
            events = discarded.events().len(),
            "Session cleared"
        );

        *guard = Some(next);
        Ok(true)
    }

    /// Expected cash in the drawer, `None` without a session.
    pub async fn running_balance(&self, drawer_id: &str) -> ApiResult<Option<Money>> {
        Ok(self.get_drawer(drawer_id).await?.running_balance)
    }

    /// Snapshot of one drawer.
    pub async fn get_drawer(&self, drawer_id: &str) -> ApiResult<DrawerSnapshot> {
        validate_drawer_id(drawer_id)?;
        let slot = self.registry.slot(drawer_id);
        let mut guard = slot.lock().await;
        let drawer = self.loaded(drawer_id, &mut guard).await?;
        Ok(DrawerSnapshot::from(&*drawer))
    }

    /// Snapshots of every drawer with a stored session.
    pub async fn list_drawers(&self) -> ApiResult<Vec<DrawerSnapshot>> {
        let ids = self.db.drawers().list_drawer_ids().await?;
        let mut snapshots = Vec::with_capacity(ids.len());
        for id in ids {
            snapshots.push(self.get_drawer(&id).await?);
        }
        Ok(snapshots)
    }

    /// Closed sessions not yet uploaded.
    pub async fn pending_sync_count(&self) -> ApiResult<i64> {
        Ok(self.db.sync_outbox().pending_count().await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Returns the slot's drawer, loading it from storage on first use and
    /// reloading it when the stored session id or version has moved.
    async fn loaded<'a>(
        &self,
        drawer_id: &str,
        slot: &'a mut Option<CashDrawer>,
    ) -> ApiResult<&'a mut CashDrawer> {
        let repo = self.db.drawers();

        let held = slot
            .as_ref()
            .map(|drawer| drawer.session().map(|s| (s.id.clone(), s.version)));
        if let Some(held) = held {
            let stored = repo.stored_version(drawer_id).await?;
            if stored != held {
                debug!(
                    drawer_id = %drawer_id,
                    ?held,
                    ?stored,
                    "Cached drawer is stale, reloading"
                );
                *slot = None;
            }
        }

        if slot.is_none() {
            let session = repo.load_current(drawer_id).await?;
            debug!(
                drawer_id = %drawer_id,
                has_session = session.is_some(),
                "Drawer rehydrated"
            );
            *slot = Some(CashDrawer::restore(drawer_id, session));
        }
        slot.as_mut()
            .ok_or_else(|| ApiError::internal("drawer slot empty after load"))
    }

    /// Drops the cached drawer when storage says it is stale.
    fn evict_on_conflict(
        &self,
        drawer_id: &str,
        slot: &mut Option<CashDrawer>,
        err: DbError,
    ) -> ApiError {
        let stale = err.is_conflict()
            || matches!(err, DbError::SessionClosed { .. } | DbError::NotFound { .. });
        if stale {
            debug!(drawer_id = %drawer_id, error = %err, "Evicting stale drawer");
            *slot = None;
        }
        err.into()
    }
}

/// Version of the drawer's session before a mutation. Zero without a
/// session; the mutation itself rejects that case first.
fn current_version(drawer: &CashDrawer) -> i64 {
    drawer.session().map(|s| s.version).unwrap_or_default()
}

// =============================================================================
// Unit Tests
// =============================================================================
