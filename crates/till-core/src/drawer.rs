//! # Cash Drawer Session Manager
//!
//! One `CashDrawer` per physical drawer. It holds at most one session and
//! moves through a three-state machine.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │              open_drawer                 close_drawer                   │
//! │  ┌───────────┐ ────────► ┌──────────┐ ────────────► ┌──────────┐        │
//! │  │ NoSession │           │   Open   │               │  Closed  │        │
//! │  └───────────┘ ◄──────── └──────────┘               └──────────┘        │
//! │        ▲     clear_session    │  ▲                        │             │
//! │        │                      └──┘ add_event              │             │
//! │        └──────────────────────────────────────────────────┘             │
//! │                           clear_session                                 │
//! │                                                                         │
//! │  open_drawer from Open/Closed replaces the session (logged as warn).    │
//! │  No transition appends events to a Closed session.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshots
//! Mutating calls return owned copies of what they produced; reads borrow.
//! Callers never get `&mut` into the log.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::ledger::DrawerSummary;
use crate::money::Money;
use crate::types::{CashEvent, CashEventType, DrawerSession};
use crate::validation::{
    validate_actual_cash, validate_event_amount, validate_opening_float, validate_reason,
};

// =============================================================================
// Drawer Status
// =============================================================================

/// Where a drawer is in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DrawerStatus {
    NoSession,
    Open,
    Closed,
}

impl fmt::Display for DrawerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawerStatus::NoSession => write!(f, "no_session"),
            DrawerStatus::Open => write!(f, "open"),
            DrawerStatus::Closed => write!(f, "closed"),
        }
    }
}

// =============================================================================
// Cash Drawer
// =============================================================================

/// The single source of truth for one drawer's cash position during a shift.
#[derive(Debug, Clone)]
pub struct CashDrawer {
    drawer_id: String,
    session: Option<DrawerSession>,
}

impl CashDrawer {
    /// Creates a drawer with no session.
    pub fn new(drawer_id: impl Into<String>) -> Self {
        CashDrawer {
            drawer_id: drawer_id.into(),
            session: None,
        }
    }

    /// Creates a drawer around a session reloaded from storage.
    pub fn restore(drawer_id: impl Into<String>, session: Option<DrawerSession>) -> Self {
        CashDrawer {
            drawer_id: drawer_id.into(),
            session,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn drawer_id(&self) -> &str {
        &self.drawer_id
    }

    /// Current lifecycle state.
    pub fn status(&self) -> DrawerStatus {
        match &self.session {
            None => DrawerStatus::NoSession,
            Some(s) if s.is_open() => DrawerStatus::Open,
            Some(_) => DrawerStatus::Closed,
        }
    }

    /// The current session, open or closed.
    pub fn session(&self) -> Option<&DrawerSession> {
        self.session.as_ref()
    }

    /// The current session's log (empty with no session).
    pub fn events(&self) -> &[CashEvent] {
        self.session.as_ref().map(|s| s.events()).unwrap_or(&[])
    }

    /// Expected cash; `None` with no session.
    pub fn running_balance(&self) -> Option<Money> {
        self.session.as_ref().map(DrawerSession::running_balance)
    }

    /// Variance recorded at close; `None` until closed.
    pub fn over_short(&self) -> Option<Money> {
        self.session.as_ref().and_then(DrawerSession::over_short)
    }

    /// Display snapshot of the current session.
    pub fn summary(&self) -> Option<DrawerSummary> {
        self.session.as_ref().map(DrawerSummary::of)
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Starts a new session with an empty log.
    ///
    /// ## Errors
    /// - `InvalidAmount` if `opening_float < 0`
    /// - `OutOfRange` above MAX_DRAWER_CASH_CENTS
    ///
    /// Any existing session is discarded first.
    pub fn open_drawer(&mut self, opening_float: Money) -> CoreResult<DrawerSession> {
        validate_opening_float(opening_float)?;

        if let Some(previous) = self.session.take() {
            warn!(
                drawer_id = %self.drawer_id,
                session_id = %previous.id,
                was_open = previous.is_open(),
                events = previous.events().len(),
                "Replacing existing drawer session"
            );
        }

        let session = DrawerSession::open(&self.drawer_id, opening_float, Utc::now());
        debug!(
            drawer_id = %self.drawer_id,
            session_id = %session.id,
            opening_float = %opening_float,
            "Drawer opened"
        );

        self.session = Some(session.clone());
        Ok(session)
    }

    /// Appends a cash movement to the open session.
    ///
    /// ## Errors
    /// - `InvalidAmount` if `amount <= 0` (or above the single-movement cap)
    /// - `MissingReason` if `reason` is blank
    /// - `SessionNotOpen` if there is no open session
    /// - `OutOfRange` if the balance would pass ±MAX_DRAWER_CASH_CENTS
    ///
    /// The log is untouched on every error path.
    pub fn add_event(
        &mut self,
        event_type: CashEventType,
        amount: Money,
        reason: &str,
    ) -> CoreResult<CashEvent> {
        validate_event_amount(amount)?;
        let reason = validate_reason(reason)?;

        let status = self.status();
        let session = match self.session.as_mut() {
            Some(s) if s.is_open() => s,
            _ => {
                return Err(CoreError::SessionNotOpen {
                    drawer_id: self.drawer_id.clone(),
                    status,
                })
            }
        };

        let event = CashEvent {
            id: Uuid::new_v4().to_string(),
            session_id: session.id.clone(),
            sequence: session.next_sequence(),
            event_type,
            amount_cents: amount.cents(),
            reason,
            created_at: Utc::now(),
        };
        session.push_event(event.clone())?;

        debug!(
            drawer_id = %self.drawer_id,
            session_id = %event.session_id,
            sequence = event.sequence,
            event_type = %event.event_type,
            amount = %amount,
            "Cash event recorded"
        );

        Ok(event)
    }

    /// Counts the drawer and freezes the session.
    ///
    /// ## Errors
    /// - `InvalidAmount` if `actual_cash < 0`
    /// - `OutOfRange` above MAX_DRAWER_CASH_CENTS
    /// - `SessionNotOpen` if there is no open session
    pub fn close_drawer(&mut self, actual_cash: Money) -> CoreResult<DrawerSession> {
        validate_actual_cash(actual_cash)?;

        let status = self.status();
        let session = match self.session.as_mut() {
            Some(s) if s.is_open() => s,
            _ => {
                return Err(CoreError::SessionNotOpen {
                    drawer_id: self.drawer_id.clone(),
                    status,
                })
            }
        };

        session.close(actual_cash, Utc::now())?;

        debug!(
            drawer_id = %self.drawer_id,
            session_id = %session.id,
            actual_cash = %actual_cash,
            over_short = session.over_short_cents.unwrap_or_default(),
            "Drawer closed"
        );

        Ok(session.clone())
    }

    /// Discards the current session, open or closed. There is no undo.
    ///
    /// Returns what was discarded so the caller can log or archive it.
    pub fn clear_session(&mut self) -> Option<DrawerSession> {
        let discarded = self.session.take();
        if let Some(session) = &discarded {
            warn!(
                drawer_id = %self.drawer_id,
                session_id = %session.id,
                events = session.events().len(),
                "Drawer session cleared"
            );
        }
        discarded
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::ledger::Variance;
    use crate::{MAX_DRAWER_CASH_CENTS, MAX_EVENT_AMOUNT_CENTS};
    use proptest::prelude::*;

    fn cents(c: i64) -> Money {
        Money::from_cents(c)
    }

    fn open_drawer(float: i64) -> CashDrawer {
        let mut drawer = CashDrawer::new("front-1");
        drawer.open_drawer(cents(float)).unwrap();
        drawer
    }

    #[test]
    fn test_new_drawer_has_no_session() {
        let drawer = CashDrawer::new("front-1");
        assert_eq!(drawer.status(), DrawerStatus::NoSession);
        assert_eq!(drawer.running_balance(), None);
        assert!(drawer.events().is_empty());
        assert!(drawer.summary().is_none());
    }

    #[test]
    fn test_open_sets_balance_to_float() {
        let drawer = open_drawer(20000);
        assert_eq!(drawer.status(), DrawerStatus::Open);
        assert_eq!(drawer.running_balance(), Some(cents(20000)));
        assert_eq!(drawer.session().unwrap().version, 1);
    }

    #[test]
    fn test_open_with_zero_float_is_allowed() {
        let drawer = open_drawer(0);
        assert_eq!(drawer.running_balance(), Some(Money::zero()));
    }

    #[test]
    fn test_open_rejects_negative_float() {
        let mut drawer = CashDrawer::new("front-1");
        let err = drawer.open_drawer(cents(-1)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidAmount { cents: -1, .. })
        ));
        assert_eq!(drawer.status(), DrawerStatus::NoSession);
    }

    #[test]
    fn test_safe_drop_scenario() {
        let mut drawer = open_drawer(20000);
        drawer
            .add_event(CashEventType::CashOut, cents(5000), "safe drop")
            .unwrap();
        drawer
            .add_event(CashEventType::CashIn, cents(2000), "change fund")
            .unwrap();
        assert_eq!(drawer.running_balance(), Some(cents(17000)));

        let closed = drawer.close_drawer(cents(16500)).unwrap();
        assert_eq!(closed.over_short(), Some(cents(-500)));
        assert_eq!(drawer.status(), DrawerStatus::Closed);

        let summary = drawer.summary().unwrap();
        assert_eq!(summary.variance, Some(Variance::Short));
        assert_eq!(summary.expected, cents(17000));
        assert_eq!(summary.event_count, 2);
    }

    #[test]
    fn test_events_get_sequential_numbers_and_bump_version() {
        let mut drawer = open_drawer(1000);
        let first = drawer
            .add_event(CashEventType::PaidOut, cents(100), "milk")
            .unwrap();
        let second = drawer
            .add_event(CashEventType::PaidIn, cents(50), "tab repaid")
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(drawer.session().unwrap().version, 3);
        assert_eq!(drawer.events().len(), 2);
    }

    #[test]
    fn test_reason_is_trimmed() {
        let mut drawer = open_drawer(1000);
        let event = drawer
            .add_event(CashEventType::CashIn, cents(10), "  change fund  ")
            .unwrap();
        assert_eq!(event.reason, "change fund");
    }

    #[test]
    fn test_add_event_rejects_non_positive_amounts() {
        let mut drawer = open_drawer(1000);
        for bad in [0, -1, -500] {
            let err = drawer
                .add_event(CashEventType::CashIn, cents(bad), "reason")
                .unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::InvalidAmount { .. })
            ));
        }
        assert!(drawer.events().is_empty());
        assert_eq!(drawer.session().unwrap().version, 1);
    }

    #[test]
    fn test_add_event_rejects_blank_reason() {
        let mut drawer = open_drawer(1000);
        for blank in ["", "   ", "\t\n"] {
            let err = drawer
                .add_event(CashEventType::CashOut, cents(100), blank)
                .unwrap_err();
            assert_eq!(err, CoreError::Validation(ValidationError::MissingReason));
        }
        assert!(drawer.events().is_empty());
    }

    #[test]
    fn test_add_event_without_session_fails() {
        let mut drawer = CashDrawer::new("front-1");
        let err = drawer
            .add_event(CashEventType::CashIn, cents(100), "reason")
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::SessionNotOpen {
                drawer_id: "front-1".to_string(),
                status: DrawerStatus::NoSession,
            }
        );
    }

    #[test]
    fn test_closed_session_accepts_no_transitions() {
        let mut drawer = open_drawer(1000);
        drawer.close_drawer(cents(1000)).unwrap();
        let frozen = drawer.session().cloned().unwrap();

        let err = drawer
            .add_event(CashEventType::CashIn, cents(100), "late")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::SessionNotOpen {
                status: DrawerStatus::Closed,
                ..
            }
        ));

        assert!(drawer.close_drawer(cents(900)).is_err());
        assert_eq!(drawer.session(), Some(&frozen));
    }

    #[test]
    fn test_close_rejects_negative_count() {
        let mut drawer = open_drawer(1000);
        let err = drawer.close_drawer(cents(-1)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::InvalidAmount { .. })
        ));
        assert_eq!(drawer.status(), DrawerStatus::Open);
    }

    #[test]
    fn test_close_exact_count_and_over() {
        let mut exact = open_drawer(1000);
        exact
            .add_event(CashEventType::SafeDrop, cents(400), "drop")
            .unwrap();
        let closed = exact.close_drawer(cents(600)).unwrap();
        assert_eq!(closed.over_short(), Some(Money::zero()));

        let mut over = open_drawer(1000);
        let closed = over.close_drawer(cents(1025)).unwrap();
        assert_eq!(closed.over_short(), Some(cents(25)));
    }

    #[test]
    fn test_clear_then_open_starts_fresh() {
        let mut drawer = open_drawer(1000);
        drawer
            .add_event(CashEventType::CashIn, cents(500), "float top-up")
            .unwrap();
        drawer.close_drawer(cents(1500)).unwrap();
        let old_id = drawer.session().unwrap().id.clone();

        let discarded = drawer.clear_session().unwrap();
        assert_eq!(discarded.id, old_id);
        assert_eq!(drawer.status(), DrawerStatus::NoSession);
        assert!(drawer.clear_session().is_none());

        let fresh = drawer.open_drawer(cents(300)).unwrap();
        assert_ne!(fresh.id, old_id);
        assert!(fresh.events().is_empty());
        assert_eq!(drawer.running_balance(), Some(cents(300)));
    }

    #[test]
    fn test_open_replaces_open_session() {
        let mut drawer = open_drawer(1000);
        drawer
            .add_event(CashEventType::CashIn, cents(500), "top-up")
            .unwrap();
        let first_id = drawer.session().unwrap().id.clone();

        let replacement = drawer.open_drawer(cents(200)).unwrap();
        assert_ne!(replacement.id, first_id);
        assert!(drawer.events().is_empty());
        assert_eq!(drawer.running_balance(), Some(cents(200)));
    }

    #[test]
    fn test_float_and_count_limits() {
        let mut drawer = CashDrawer::new("front-1");
        for too_big in [MAX_DRAWER_CASH_CENTS + 1, i64::MAX] {
            let err = drawer.open_drawer(cents(too_big)).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::OutOfRange { .. })
            ));
        }
        assert_eq!(drawer.status(), DrawerStatus::NoSession);

        let mut drawer = open_drawer(0);
        drawer
            .add_event(CashEventType::CashOut, cents(1), "x")
            .unwrap();
        let err = drawer.close_drawer(cents(i64::MAX)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert_eq!(drawer.status(), DrawerStatus::Open);

        let closed = drawer.close_drawer(cents(MAX_DRAWER_CASH_CENTS)).unwrap();
        assert_eq!(closed.over_short(), Some(cents(MAX_DRAWER_CASH_CENTS + 1)));
    }

    #[test]
    fn test_balance_limit_rejects_event_and_keeps_log() {
        let mut drawer = open_drawer(MAX_DRAWER_CASH_CENTS);
        let err = drawer
            .add_event(CashEventType::CashIn, cents(1), "one too many")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        assert!(drawer.events().is_empty());
        assert_eq!(drawer.session().unwrap().version, 1);
        assert_eq!(drawer.running_balance(), Some(cents(MAX_DRAWER_CASH_CENTS)));

        drawer
            .add_event(CashEventType::SafeDrop, cents(1), "drop")
            .unwrap();
        assert_eq!(drawer.running_balance(), Some(cents(MAX_DRAWER_CASH_CENTS - 1)));
    }

    #[test]
    fn test_widest_variance_at_close() {
        let mut drawer = open_drawer(0);
        for _ in 0..(MAX_DRAWER_CASH_CENTS / MAX_EVENT_AMOUNT_CENTS) {
            drawer
                .add_event(CashEventType::CashOut, cents(MAX_EVENT_AMOUNT_CENTS), "out")
                .unwrap();
        }
        assert_eq!(drawer.running_balance(), Some(cents(-MAX_DRAWER_CASH_CENTS)));
        assert!(drawer
            .add_event(CashEventType::CashOut, cents(1), "out")
            .is_err());

        let closed = drawer.close_drawer(cents(MAX_DRAWER_CASH_CENTS)).unwrap();
        assert_eq!(closed.over_short(), Some(cents(2 * MAX_DRAWER_CASH_CENTS)));
        assert_eq!(drawer.summary().unwrap().variance, Some(Variance::Over));
    }

    proptest! {
        /// Property: near the cash limit every movement either lands exactly
        /// or is rejected, and the balance never leaves the allowed range.
        #[test]
        fn balance_stays_within_limit(
            float in (MAX_DRAWER_CASH_CENTS - 20_000_000)..=MAX_DRAWER_CASH_CENTS,
            moves in prop::collection::vec((0usize..6, 1i64..=MAX_EVENT_AMOUNT_CENTS), 0..15),
        ) {
            let mut drawer = CashDrawer::new("prop");
            drawer.open_drawer(Money::from_cents(float)).unwrap();
            let mut expected = float;

            for (idx, amount) in moves {
                let event_type = CashEventType::ALL[idx];
                let signed = if event_type.is_inflow() { amount } else { -amount };
                let result = drawer.add_event(event_type, Money::from_cents(amount), "prop");

                if (expected + signed).abs() <= MAX_DRAWER_CASH_CENTS {
                    prop_assert!(result.is_ok());
                    expected += signed;
                } else {
                    prop_assert!(result.is_err());
                }
                prop_assert_eq!(drawer.running_balance(), Some(Money::from_cents(expected)));
            }

            let closed = drawer.close_drawer(Money::from_cents(MAX_DRAWER_CASH_CENTS)).unwrap();
            prop_assert_eq!(
                closed.over_short(),
                Some(Money::from_cents(MAX_DRAWER_CASH_CENTS - expected))
            );
        }

        /// Property: whatever valid movements are recorded, closing with the
        /// running balance reconciles to exactly zero.
        #[test]
        fn closing_at_running_balance_is_exact(
            float in 0i64..5_000_000,
            moves in prop::collection::vec((0usize..6, 1i64..100_000), 0..15),
        ) {
            let mut drawer = CashDrawer::new("prop");
            drawer.open_drawer(Money::from_cents(float)).unwrap();
            for (idx, amount) in moves {
                drawer
                    .add_event(CashEventType::ALL[idx], Money::from_cents(amount), "prop")
                    .unwrap();
            }

            let expected = drawer.running_balance().unwrap();
            prop_assume!(!expected.is_negative());
            let closed = drawer.close_drawer(expected).unwrap();
            prop_assert_eq!(closed.over_short(), Some(Money::zero()));
        }
    }
}
