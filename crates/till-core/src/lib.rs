//! # till-core: Pure Cash Drawer Logic for Till
//!
//! This crate is the **heart** of Till. It owns the cash drawer ledger as
//! plain data plus pure functions, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Till Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Frontend (drawer screens)                    │   │
//! │  │    Open Till ──► Cash In/Out ──► Count Drawer ──► Close Till    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-hub (per-drawer locks)                  │   │
//! │  │    open_drawer, add_event, close_drawer, clear_session          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  drawer   │  │ validation│  │   │
//! │  │   │ CashEvent │  │   Money   │  │CashDrawer │  │   rules   │  │   │
//! │  │   │  Session  │  │           │  │  ledger   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │              SQLite event log, migrations, outbox               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashEvent, DrawerSession, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - Pure balance and over/short derivations
//! - [`drawer`] - The per-drawer session state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{CashDrawer, CashEventType, Money};
//!
//! let mut drawer = CashDrawer::new("front-1");
//! drawer.open_drawer(Money::from_cents(20000)).unwrap();
//! drawer
//!     .add_event(CashEventType::CashOut, Money::from_cents(5000), "safe drop")
//!     .unwrap();
//! drawer
//!     .add_event(CashEventType::CashIn, Money::from_cents(2000), "change fund")
//!     .unwrap();
//! assert_eq!(drawer.running_balance(), Some(Money::from_cents(17000)));
//!
//! let closed = drawer.close_drawer(Money::from_cents(16500)).unwrap();
//! assert_eq!(closed.over_short(), Some(Money::from_cents(-500)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod drawer;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use drawer::{CashDrawer, DrawerStatus};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{DrawerSummary, FlowTotals, Variance};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Largest single cash movement accepted, in cents ($100,000.00).
///
/// ## Business Reason
/// Catches keying mistakes (an extra pair of zeros) before they hit the log.
pub const MAX_EVENT_AMOUNT_CENTS: i64 = 10_000_000;

/// Largest opening float, counted cash or expected balance magnitude, in
/// cents ($10,000,000.00).
///
/// Keeps every balance and over/short far inside `i64`.
pub const MAX_DRAWER_CASH_CENTS: i64 = 1_000_000_000;

/// Maximum length of an event reason, in characters.
pub const MAX_REASON_LEN: usize = 200;

/// Maximum length of a drawer identifier.
pub const MAX_DRAWER_ID_LEN: usize = 64;
