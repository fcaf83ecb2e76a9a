//! # API Error Types
//!
//! Error type returned by every `DrawerService` operation.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Error Handling Flow                               │
//! │                                                                         │
//! │  CashDrawer / Repository                                               │
//! │       │                                                                 │
//! │       ├── CoreError::Validation(InvalidAmount)  ──► INVALID_AMOUNT     │
//! │       ├── CoreError::Validation(MissingReason)  ──► MISSING_REASON     │
//! │       ├── CoreError::SessionNotOpen             ──► SESSION_NOT_OPEN   │
//! │       ├── DbError::VersionConflict              ──► CONFLICT           │
//! │       └── DbError::QueryFailed                  ──► DATABASE_ERROR     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ApiError { code, message }  (serialized as camelCase JSON)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Database details are logged, never shown to the cashier.

use serde::Serialize;
use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// Error returned to the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for the terminal to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed (other than the two below)
    ValidationError,

    /// Amount not accepted for this operation
    InvalidAmount,

    /// Cash movement without a reason
    MissingReason,

    /// Drawer has no open session
    SessionNotOpen,

    /// Drawer changed elsewhere; reload and retry
    Conflict,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

/// Result type for service operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            ValidationError::MissingReason => ErrorCode::MissingReason,
            _ => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::SessionNotOpen { .. } => {
                ApiError::new(ErrorCode::SessionNotOpen, err.to_string())
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::VersionConflict { .. } | DbError::UniqueViolation { .. } => {
                tracing::warn!(error = %err, "Concurrent drawer update");
                ApiError::new(
                    ErrorCode::Conflict,
                    "Drawer was changed on another terminal, reload and try again",
                )
            }
            DbError::SessionClosed { session_id } => ApiError::new(
                ErrorCode::SessionNotOpen,
                format!("Session {} is already closed", session_id),
            ),
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => {
                tracing::error!(error = %err, "Database unavailable");
                ApiError::new(ErrorCode::DatabaseError, "Database unavailable")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::Corrupt(e) => {
                tracing::error!("Stored drawer session is corrupt: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Stored drawer session is corrupt")
            }
            DbError::ForeignKeyViolation { .. }
            | DbError::QueryFailed(_)
            | DbError::Serialization(_)
            | DbError::Internal(_) => {
                tracing::error!("Database operation failed: {}", err);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
