//! # Validation Module
//!
//! Input validation utilities for Till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend                                                     │
//! │  ├── Basic format checks (empty reason, amount field)                  │
//! │  └── Immediate cashier feedback                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: CashDrawer (Rust)                                            │
//! │  └── THIS MODULE: amount sign, reason, identifiers                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (amount_cents > 0)                                          │
//! │  └── UNIQUE (session_id, sequence)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_event_amount, validate_reason};
//! use till_core::Money;
//!
//! validate_event_amount(Money::from_cents(5000)).unwrap();
//! assert_eq!(validate_reason("  safe drop ").unwrap(), "safe drop");
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_DRAWER_CASH_CENTS, MAX_DRAWER_ID_LEN, MAX_EVENT_AMOUNT_CENTS, MAX_REASON_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates the float a session starts with.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (a till opened empty)
/// - Must not exceed MAX_DRAWER_CASH_CENTS
pub fn validate_opening_float(amount: Money) -> ValidationResult<()> {
    validate_drawer_cash("opening float", amount)
}

/// Validates a cash movement amount.
///
/// ## Rules
/// - Must be positive (> 0); direction comes from the event type
/// - Must not exceed MAX_EVENT_AMOUNT_CENTS
///
/// ## Cashier Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Drawer: Record Safe Drop                                               │
/// │                                                                         │
/// │  Cashier enters amount: 50.00                                          │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_event_amount(5000) ← THIS FUNCTION                           │
/// │       │                                                                 │
/// │       ├── amount <= 0? → InvalidAmount                                 │
/// │       ├── amount > cap? → OutOfRange                                   │
/// │       └── OK → event appended                                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_event_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::invalid_amount("amount", amount.cents()));
    }

    if amount.cents() > MAX_EVENT_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: 1,
            max: MAX_EVENT_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates the counted cash entered at close.
///
/// ## Rules
/// - Must be non-negative (>= 0); an empty drawer counts as zero
/// - Must not exceed MAX_DRAWER_CASH_CENTS
pub fn validate_actual_cash(amount: Money) -> ValidationResult<()> {
    validate_drawer_cash("actual cash", amount)
}

/// Validates an expected balance after a movement.
///
/// Cash out beyond the float can drive it negative; either way its
/// magnitude stays within MAX_DRAWER_CASH_CENTS.
pub fn validate_balance(balance: Money) -> ValidationResult<()> {
    if balance.cents().abs() > MAX_DRAWER_CASH_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "running balance".to_string(),
            min: -MAX_DRAWER_CASH_CENTS,
            max: MAX_DRAWER_CASH_CENTS,
        });
    }
    Ok(())
}

fn validate_drawer_cash(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::invalid_amount(field, amount.cents()));
    }

    if amount.cents() > MAX_DRAWER_CASH_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_DRAWER_CASH_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an event reason and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most MAX_REASON_LEN characters
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_reason;
///
/// assert!(validate_reason("change fund").is_ok());
/// assert!(validate_reason("   ").is_err());
/// ```
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::MissingReason);
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(reason.to_string())
}

/// Validates a drawer identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most MAX_DRAWER_ID_LEN characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_drawer_id;
///
/// assert!(validate_drawer_id("front-1").is_ok());
/// assert!(validate_drawer_id("front 1").is_err());
/// ```
pub fn validate_drawer_id(drawer_id: &str) -> ValidationResult<()> {
    if drawer_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "drawer_id".to_string(),
        });
    }

    if drawer_id.len() > MAX_DRAWER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "drawer_id".to_string(),
            max: MAX_DRAWER_ID_LEN,
        });
    }

    if !drawer_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "drawer_id".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_opening_float() {
        assert!(validate_opening_float(Money::zero()).is_ok());
        assert!(validate_opening_float(Money::from_cents(20000)).is_ok());
        assert!(validate_opening_float(Money::from_cents(-1)).is_err());

        assert!(validate_opening_float(Money::from_cents(MAX_DRAWER_CASH_CENTS)).is_ok());
        assert!(matches!(
            validate_opening_float(Money::from_cents(MAX_DRAWER_CASH_CENTS + 1)),
            Err(ValidationError::OutOfRange { min: 0, .. })
        ));
        assert!(matches!(
            validate_opening_float(Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_event_amount() {
        assert!(validate_event_amount(Money::from_cents(1)).is_ok());
        assert!(validate_event_amount(Money::from_cents(MAX_EVENT_AMOUNT_CENTS)).is_ok());

        assert!(matches!(
            validate_event_amount(Money::zero()),
            Err(ValidationError::InvalidAmount { cents: 0, .. })
        ));
        assert!(matches!(
            validate_event_amount(Money::from_cents(-100)),
            Err(ValidationError::InvalidAmount { cents: -100, .. })
        ));
        assert!(matches!(
            validate_event_amount(Money::from_cents(MAX_EVENT_AMOUNT_CENTS + 1)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_actual_cash() {
        assert!(validate_actual_cash(Money::zero()).is_ok());
        assert!(validate_actual_cash(Money::from_cents(-1)).is_err());

        assert!(validate_actual_cash(Money::from_cents(MAX_DRAWER_CASH_CENTS)).is_ok());
        assert!(matches!(
            validate_actual_cash(Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "actual cash"
        ));
    }

    #[test]
    fn test_validate_balance() {
        assert!(validate_balance(Money::from_cents(MAX_DRAWER_CASH_CENTS)).is_ok());
        assert!(validate_balance(Money::from_cents(-MAX_DRAWER_CASH_CENTS)).is_ok());
        assert!(validate_balance(Money::from_cents(MAX_DRAWER_CASH_CENTS + 1)).is_err());
        assert!(validate_balance(Money::from_cents(-MAX_DRAWER_CASH_CENTS - 1)).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert_eq!(validate_reason("safe drop").unwrap(), "safe drop");
        assert_eq!(validate_reason("\tchange fund\n").unwrap(), "change fund");
        assert_eq!(validate_reason(""), Err(ValidationError::MissingReason));
        assert_eq!(validate_reason("    "), Err(ValidationError::MissingReason));
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN)).is_ok());
        assert!(matches!(
            validate_reason(&"x".repeat(MAX_REASON_LEN + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_drawer_id() {
        assert!(validate_drawer_id("front-1").is_ok());
        assert!(validate_drawer_id("BAR_2").is_ok());

        assert!(validate_drawer_id("").is_err());
        assert!(validate_drawer_id("   ").is_err());
        assert!(validate_drawer_id("till/1").is_err());
        assert!(validate_drawer_id(&"a".repeat(MAX_DRAWER_ID_LEN + 1)).is_err());
    }
}
