//! # Domain Types
//!
//! Core domain types used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐          ┌─────────────────────┐              │
//! │  │   DrawerSession     │ 1      * │     CashEvent       │              │
//! │  │  ─────────────────  │─────────►│  ─────────────────  │              │
//! │  │  id (UUID)          │          │  id (UUID)          │              │
//! │  │  drawer_id          │          │  session_id (FK)    │              │
//! │  │  opening_float      │          │  sequence (1..n)    │              │
//! │  │  closed_at?         │          │  event_type         │              │
//! │  │  actual_cash?       │          │  amount_cents (>0)  │              │
//! │  │  over_short?        │          │  reason             │              │
//! │  │  version            │          └─────────────────────┘              │
//! │  └─────────────────────┘                                                │
//! │                                                                         │
//! │  ┌─────────────────────┐          ┌─────────────────────┐              │
//! │  │   CashEventType     │─flow()──►│     CashFlow        │              │
//! │  │  opening, cash_in,  │          │  Inflow / Outflow   │              │
//! │  │  paid_in, cash_out, │          └─────────────────────┘              │
//! │  │  paid_out, safe_drop│                                                │
//! │  └─────────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Append-Only Log
//! A session's events are only ever pushed; nothing here hands out `&mut`
//! access to an appended event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreResult, ValidationError};
use crate::ledger;
use crate::money::Money;
use crate::validation::{validate_balance, validate_opening_float, ValidationResult};

// =============================================================================
// Cash Flow Direction
// =============================================================================

/// Direction a cash movement moves the drawer balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashFlow {
    /// Adds to the expected drawer balance.
    Inflow,
    /// Subtracts from the expected drawer balance.
    Outflow,
}

// =============================================================================
// Cash Event Type
// =============================================================================

/// The kind of cash movement recorded against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashEventType {
    /// Additional starting cash added after the till was opened.
    Opening,
    /// Cash added to the drawer (e.g., change fund top-up).
    CashIn,
    /// Cash received for a non-sale reason (e.g., customer repays a tab).
    PaidIn,
    /// Cash removed from the drawer.
    CashOut,
    /// Cash paid out for an expense (e.g., delivery tip, supplies).
    PaidOut,
    /// Excess cash moved to the safe mid-shift.
    SafeDrop,
}

impl CashEventType {
    /// Every event type, in display order.
    pub const ALL: [CashEventType; 6] = [
        CashEventType::Opening,
        CashEventType::CashIn,
        CashEventType::PaidIn,
        CashEventType::CashOut,
        CashEventType::PaidOut,
        CashEventType::SafeDrop,
    ];

    /// Fixed classification of each type into inflow or outflow.
    ///
    /// ```text
    /// opening, cash_in, paid_in      → Inflow  (+)
    /// cash_out, paid_out, safe_drop  → Outflow (−)
    /// ```
    pub const fn flow(&self) -> CashFlow {
        match self {
            CashEventType::Opening | CashEventType::CashIn | CashEventType::PaidIn => {
                CashFlow::Inflow
            }
            CashEventType::CashOut | CashEventType::PaidOut | CashEventType::SafeDrop => {
                CashFlow::Outflow
            }
        }
    }

    /// Returns true if this type adds to the balance.
    #[inline]
    pub const fn is_inflow(&self) -> bool {
        matches!(self.flow(), CashFlow::Inflow)
    }

    /// Storage and wire name (`snake_case`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            CashEventType::Opening => "opening",
            CashEventType::CashIn => "cash_in",
            CashEventType::PaidIn => "paid_in",
            CashEventType::CashOut => "cash_out",
            CashEventType::PaidOut => "paid_out",
            CashEventType::SafeDrop => "safe_drop",
        }
    }
}

impl fmt::Display for CashEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CashEventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        CashEventType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "event_type".to_string(),
                reason: format!(
                    "unknown type '{}'; expected one of: opening, cash_in, paid_in, cash_out, paid_out, safe_drop",
                    s
                ),
            })
    }
}

// =============================================================================
// Cash Event
// =============================================================================

/// A single cash movement recorded against an open session.
///
/// Immutable once appended. `sequence` is the 1-based position in the
/// session's log and is what the database orders by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashEvent {
    pub id: String,
    pub session_id: String,
    pub sequence: i64,
    pub event_type: CashEventType,
    /// Always positive; direction comes from `event_type`.
    pub amount_cents: i64,
    /// Trimmed, never empty.
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CashEvent {
    /// Returns the amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the amount with the sign of its flow (+ inflow, − outflow).
    pub fn signed_amount(&self) -> Money {
        match self.event_type.flow() {
            CashFlow::Inflow => self.amount(),
            CashFlow::Outflow => -self.amount(),
        }
    }
}

// =============================================================================
// Drawer Session
// =============================================================================

/// One till count, from opening float to close.
///
/// ## Lifecycle
/// ```text
/// open ──► (append events)* ──► close ──► (cleared by the drawer)
///           version += 1 each     version += 1, log frozen
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawerSession {
    pub id: String,
    pub drawer_id: String,
    pub opening_float_cents: i64,
    events: Vec<CashEvent>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    /// Counted cash entered at close.
    pub actual_cash_cents: Option<i64>,
    /// actual_cash − expected balance; set at close.
    pub over_short_cents: Option<i64>,
    /// Bumped on every mutation; storage uses it for optimistic concurrency.
    pub version: i64,
}

impl DrawerSession {
    /// Starts a fresh session with an empty log.
    pub(crate) fn open(drawer_id: &str, opening_float: Money, now: DateTime<Utc>) -> Self {
        DrawerSession {
            id: Uuid::new_v4().to_string(),
            drawer_id: drawer_id.to_string(),
            opening_float_cents: opening_float.cents(),
            events: Vec::new(),
            opened_at: now,
            closed_at: None,
            actual_cash_cents: None,
            over_short_cents: None,
            version: 1,
        }
    }

    /// Rebuilds a session from persisted parts.
    ///
    /// ## Checks
    /// - every event belongs to this session
    /// - sequences run 1..=n with no gaps (the log was append-only)
    /// - close columns are either all set or all unset
    /// - float and expected balance are within MAX_DRAWER_CASH_CENTS
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: String,
        drawer_id: String,
        opening_float_cents: i64,
        events: Vec<CashEvent>,
        opened_at: DateTime<Utc>,
        closed_at: Option<DateTime<Utc>>,
        actual_cash_cents: Option<i64>,
        over_short_cents: Option<i64>,
        version: i64,
    ) -> CoreResult<Self> {
        let corrupt = |reason: String| ValidationError::InvalidFormat {
            field: "session".to_string(),
            reason,
        };

        for (idx, event) in events.iter().enumerate() {
            if event.session_id != id {
                return Err(corrupt(format!(
                    "event {} belongs to session {}",
                    event.id, event.session_id
                ))
                .into());
            }
            let expected = idx as i64 + 1;
            if event.sequence != expected {
                return Err(corrupt(format!(
                    "event sequence {} found where {} was expected",
                    event.sequence, expected
                ))
                .into());
            }
        }

        let close_fields = [
            closed_at.is_some(),
            actual_cash_cents.is_some(),
            over_short_cents.is_some(),
        ];
        if close_fields.iter().any(|set| *set) && !close_fields.iter().all(|set| *set) {
            return Err(corrupt("partially closed session".to_string()).into());
        }

        let opening_float = Money::from_cents(opening_float_cents);
        validate_opening_float(opening_float)?;
        validate_balance(ledger::running_balance(opening_float, &events)?)?;

        Ok(DrawerSession {
            id,
            drawer_id,
            opening_float_cents,
            events,
            opened_at,
            closed_at,
            actual_cash_cents,
            over_short_cents,
            version,
        })
    }

    /// Returns the opening float as Money.
    #[inline]
    pub fn opening_float(&self) -> Money {
        Money::from_cents(self.opening_float_cents)
    }

    /// The ordered event log.
    #[inline]
    pub fn events(&self) -> &[CashEvent] {
        &self.events
    }

    /// True until `close` has run.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed_at.is_some()
    }

    /// Expected cash in the drawer, recomputed from the log.
    ///
    /// Exact: open, append and restore keep every session's balance within
    /// MAX_DRAWER_CASH_CENTS, so the saturating sum never clamps.
    pub fn running_balance(&self) -> Money {
        self.events
            .iter()
            .fold(self.opening_float(), |balance, event| {
                balance.saturating_add(event.signed_amount())
            })
    }

    /// Counted cash, once closed.
    pub fn actual_cash(&self) -> Option<Money> {
        self.actual_cash_cents.map(Money::from_cents)
    }

    /// Variance at close: positive = over, negative = short.
    pub fn over_short(&self) -> Option<Money> {
        self.over_short_cents.map(Money::from_cents)
    }

    /// Sequence number the next appended event will get.
    #[inline]
    pub fn next_sequence(&self) -> i64 {
        self.events.len() as i64 + 1
    }

    /// Appends an already-validated event and bumps the version.
    ///
    /// Rejects the event, leaving the log as is, if the balance would
    /// leave the allowed range.
    pub(crate) fn push_event(&mut self, event: CashEvent) -> ValidationResult<()> {
        debug_assert_eq!(event.sequence, self.next_sequence());
        let balance = self
            .running_balance()
            .checked_add(event.signed_amount())
            .ok_or_else(|| ValidationError::overflow("running balance"))?;
        validate_balance(balance)?;

        self.events.push(event);
        self.version += 1;
        Ok(())
    }

    /// Freezes the log and records the count.
    pub(crate) fn close(&mut self, actual_cash: Money, now: DateTime<Utc>) -> ValidationResult<()> {
        let over_short = ledger::over_short(actual_cash, self.running_balance())?;
        self.closed_at = Some(now);
        self.actual_cash_cents = Some(actual_cash.cents());
        self.over_short_cents = Some(over_short.cents());
        self.version += 1;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
