//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Drawer state machine violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-hub errors (in app)                                              │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Frontend               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::drawer::DrawerStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Drawer business logic errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The operation needs an open session and the drawer has none.
    ///
    /// ## When This Occurs
    /// - Recording a cash movement before the till is opened
    /// - Recording a cash movement after the till was closed
    /// - Closing a till twice
    #[error("Drawer {drawer_id} has no open session (status: {status})")]
    SessionNotOpen {
        drawer_id: String,
        status: DrawerStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns true for the amount/reason validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// `InvalidAmount` and `MissingReason` are the two failures a cashier can
/// trigger from the drawer screens; the rest guard identifiers and limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Monetary input is out of its allowed sign.
    ///
    /// ## When This Occurs
    /// - Opening float below zero
    /// - Event amount of zero or below
    /// - Counted cash below zero
    #[error("Invalid {field}: {cents} cents")]
    InvalidAmount { field: String, cents: i64 },

    /// The event reason is empty after trimming.
    #[error("A reason is required for every cash movement")]
    MissingReason,

    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Money arithmetic left the `i64` cent range.
    #[error("{field} is outside the supported range")]
    Overflow { field: String },

    /// Invalid format (e.g., bad decimal amount, unknown event type).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(field: impl Into<String>, cents: i64) -> Self {
        ValidationError::InvalidAmount {
            field: field.into(),
            cents,
        }
    }

    /// Creates an Overflow error.
    pub fn overflow(field: impl Into<String>) -> Self {
        ValidationError::Overflow {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SessionNotOpen {
            drawer_id: "front-1".to_string(),
            status: DrawerStatus::Closed,
        };
        assert_eq!(
            err.to_string(),
            "Drawer front-1 has no open session (status: closed)"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::invalid_amount("amount", -5);
        assert_eq!(err.to_string(), "Invalid amount: -5 cents");

        let err = ValidationError::overflow("running balance");
        assert_eq!(err.to_string(), "running balance is outside the supported range");

        let err = ValidationError::MissingReason;
        assert_eq!(
            err.to_string(),
            "A reason is required for every cash movement"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::MissingReason.into();
        assert!(core_err.is_validation());
        assert!(matches!(
            core_err,
            CoreError::Validation(ValidationError::MissingReason)
        ));
    }
}
