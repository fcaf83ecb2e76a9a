//! # Ledger Derivations
//!
//! Pure functions over `(opening_float, events)`. Nothing here is cached:
//! every balance is recomputed from the log so it can never drift from it.
//!
//! ## Balance Formula
//! ```text
//! running_balance = opening_float + Σ inflow amounts − Σ outflow amounts
//! over_short      = actual_cash − running_balance
//!                   > 0 over, < 0 short, = 0 exact
//! ```
//!
//! Sums are checked: leaving the `i64` cent range is an `Overflow` error,
//! never a wrapped number.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::drawer::DrawerStatus;
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{CashEvent, CashFlow, DrawerSession};
use crate::validation::ValidationResult;

/// Expected drawer cash for a float and an event log.
///
/// ## Example
/// ```rust
/// use till_core::ledger::running_balance;
/// use till_core::Money;
///
/// assert_eq!(running_balance(Money::from_cents(500), &[]), Ok(Money::from_cents(500)));
/// ```
pub fn running_balance(opening_float: Money, events: &[CashEvent]) -> ValidationResult<Money> {
    events
        .iter()
        .try_fold(opening_float, |balance, event| {
            balance.checked_add(event.signed_amount())
        })
        .ok_or_else(|| ValidationError::overflow("running balance"))
}

/// Variance between counted and expected cash.
#[inline]
pub fn over_short(actual_cash: Money, expected: Money) -> ValidationResult<Money> {
    actual_cash
        .checked_sub(expected)
        .ok_or_else(|| ValidationError::overflow("over/short"))
}

// =============================================================================
// Flow Totals
// =============================================================================

/// Inflow and outflow sums of a log, both non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct FlowTotals {
    pub inflow: Money,
    pub outflow: Money,
}

impl FlowTotals {
    /// Net movement (inflow − outflow).
    #[inline]
    pub fn net(&self) -> Money {
        self.inflow - self.outflow
    }
}

/// Sums a log by flow direction. Display only; saturates at `i64::MAX`.
pub fn totals(events: &[CashEvent]) -> FlowTotals {
    events
        .iter()
        .fold(FlowTotals::default(), |mut acc, event| {
            match event.event_type.flow() {
                CashFlow::Inflow => acc.inflow = acc.inflow.saturating_add(event.amount()),
                CashFlow::Outflow => acc.outflow = acc.outflow.saturating_add(event.amount()),
            }
            acc
        })
}

// =============================================================================
// Variance
// =============================================================================

/// How a counted drawer compares to its expected balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Variance {
    /// More cash than expected.
    Over,
    /// Less cash than expected.
    Short,
    /// Exact match.
    Exact,
}

impl Variance {
    /// Classifies an over/short amount by its sign.
    pub fn classify(over_short: Money) -> Self {
        if over_short.is_positive() {
            Variance::Over
        } else if over_short.is_negative() {
            Variance::Short
        } else {
            Variance::Exact
        }
    }
}

// =============================================================================
// Drawer Summary
// =============================================================================

/// Read-only snapshot for the drawer screen and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DrawerSummary {
    pub drawer_id: String,
    pub session_id: String,
    pub status: DrawerStatus,
    pub opening_float: Money,
    pub totals: FlowTotals,
    /// Expected cash (the running balance).
    pub expected: Money,
    pub actual_cash: Option<Money>,
    pub over_short: Option<Money>,
    pub variance: Option<Variance>,
    pub event_count: usize,
}

impl DrawerSummary {
    /// Builds a summary of a session.
    pub fn of(session: &DrawerSession) -> Self {
        let over_short = session.over_short();
        DrawerSummary {
            drawer_id: session.drawer_id.clone(),
            session_id: session.id.clone(),
            status: if session.is_closed() {
                DrawerStatus::Closed
            } else {
                DrawerStatus::Open
            },
            opening_float: session.opening_float(),
            totals: totals(session.events()),
            expected: session.running_balance(),
            actual_cash: session.actual_cash(),
            over_short,
            variance: over_short.map(Variance::classify),
            event_count: session.events().len(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CashEventType;
    use chrono::Utc;
    use proptest::prelude::*;

    fn event(sequence: i64, event_type: CashEventType, cents: i64) -> CashEvent {
        CashEvent {
            id: format!("e-{}", sequence),
            session_id: "s-1".to_string(),
            sequence,
            event_type,
            amount_cents: cents,
            reason: "test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn event_type_strategy() -> impl Strategy<Value = CashEventType> {
        prop::sample::select(CashEventType::ALL.to_vec())
    }

    #[test]
    fn test_balance_of_empty_log_is_float() {
        assert_eq!(
            running_balance(Money::from_cents(20000), &[]),
            Ok(Money::from_cents(20000))
        );
    }

    #[test]
    fn test_safe_drop_scenario() {
        let events = vec![
            event(1, CashEventType::CashOut, 5000),
            event(2, CashEventType::CashIn, 2000),
        ];
        let balance = running_balance(Money::from_cents(20000), &events).unwrap();
        assert_eq!(balance.cents(), 17000);
        assert_eq!(over_short(Money::from_cents(16500), balance).unwrap().cents(), -500);
    }

    #[test]
    fn test_balance_overflow_is_an_error() {
        let up = vec![event(1, CashEventType::CashIn, 1)];
        assert_eq!(
            running_balance(Money::from_cents(i64::MAX), &up),
            Err(ValidationError::overflow("running balance"))
        );

        let down = vec![
            event(1, CashEventType::CashOut, i64::MAX),
            event(2, CashEventType::CashOut, 2),
        ];
        assert!(running_balance(Money::zero(), &down).is_err());

        // Overflow midway fails even if later events would bring it back.
        let back = vec![
            event(1, CashEventType::CashIn, 1),
            event(2, CashEventType::CashOut, 1),
        ];
        assert!(running_balance(Money::from_cents(i64::MAX), &back).is_err());
        assert_eq!(
            running_balance(Money::from_cents(i64::MAX - 1), &back),
            Ok(Money::from_cents(i64::MAX - 1))
        );
    }

    #[test]
    fn test_over_short_overflow_is_an_error() {
        assert_eq!(
            over_short(Money::from_cents(i64::MAX), Money::from_cents(-1)),
            Err(ValidationError::overflow("over/short"))
        );
        assert_eq!(
            over_short(Money::from_cents(i64::MAX), Money::zero()),
            Ok(Money::from_cents(i64::MAX))
        );
    }

    #[test]
    fn test_totals_saturate() {
        let events = vec![
            event(1, CashEventType::CashIn, i64::MAX),
            event(2, CashEventType::PaidIn, 5),
        ];
        let t = totals(&events);
        assert_eq!(t.inflow.cents(), i64::MAX);
        assert!(t.outflow.is_zero());
    }

    #[test]
    fn test_totals() {
        let events = vec![
            event(1, CashEventType::Opening, 1000),
            event(2, CashEventType::PaidOut, 250),
            event(3, CashEventType::SafeDrop, 4000),
            event(4, CashEventType::PaidIn, 75),
        ];
        let t = totals(&events);
        assert_eq!(t.inflow.cents(), 1075);
        assert_eq!(t.outflow.cents(), 4250);
        assert_eq!(t.net().cents(), -3175);
    }

    #[test]
    fn test_variance_classification() {
        assert_eq!(Variance::classify(Money::from_cents(5)), Variance::Over);
        assert_eq!(Variance::classify(Money::from_cents(-5)), Variance::Short);
        assert_eq!(Variance::classify(Money::zero()), Variance::Exact);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the balance is float + Σin − Σout whatever order the
        /// movements were recorded in.
        #[test]
        fn balance_is_order_independent(
            float in 0i64..10_000_000,
            moves in prop::collection::vec((event_type_strategy(), 1i64..1_000_000), 0..20),
            seed in any::<u64>(),
        ) {
            let events: Vec<CashEvent> = moves
                .iter()
                .enumerate()
                .map(|(i, (t, cents))| event(i as i64 + 1, *t, *cents))
                .collect();

            let expected_in: i64 = moves.iter().filter(|(t, _)| t.is_inflow()).map(|(_, c)| c).sum();
            let expected_out: i64 = moves.iter().filter(|(t, _)| !t.is_inflow()).map(|(_, c)| c).sum();
            let float = Money::from_cents(float);

            let forward = running_balance(float, &events).unwrap();
            prop_assert_eq!(forward.cents(), float.cents() + expected_in - expected_out);

            let mut shuffled = events.clone();
            shuffled.reverse();
            if !shuffled.is_empty() {
                let k = (seed as usize) % shuffled.len();
                shuffled.rotate_left(k);
            }
            prop_assert_eq!(running_balance(float, &shuffled), Ok(forward));

            let t = totals(&events);
            prop_assert_eq!(float + t.net(), forward);
        }

        /// Property: counting exactly the expected cash yields zero variance.
        #[test]
        fn exact_count_has_zero_variance(expected in any::<i64>()) {
            let expected = Money::from_cents(expected);
            let variance = over_short(expected, expected).unwrap();
            prop_assert!(variance.is_zero());
            prop_assert_eq!(Variance::classify(variance), Variance::Exact);
        }

        /// Property: near the `i64` limits the balance is either exact or
        /// an overflow error, never a wrapped value.
        #[test]
        fn balance_never_wraps(
            float in (i64::MAX - 1_000_000)..=i64::MAX,
            moves in prop::collection::vec((event_type_strategy(), 1i64..1_000_000), 0..8),
        ) {
            let events: Vec<CashEvent> = moves
                .iter()
                .enumerate()
                .map(|(i, (t, cents))| event(i as i64 + 1, *t, *cents))
                .collect();

            let mut exact = float as i128;
            let mut overflowed = false;
            for (t, cents) in &moves {
                exact += if t.is_inflow() { *cents as i128 } else { -(*cents as i128) };
                overflowed |= exact > i64::MAX as i128;
            }

            match running_balance(Money::from_cents(float), &events) {
                Ok(balance) => {
                    prop_assert!(!overflowed);
                    prop_assert_eq!(balance.cents() as i128, exact);
                }
                Err(err) => {
                    prop_assert!(overflowed);
                    prop_assert_eq!(err, ValidationError::overflow("running balance"));
                }
            }
        }
    }
}
