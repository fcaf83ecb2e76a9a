//! # Repository Module
//!
//! Database repository implementations for Till.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  DrawerService                                                         │
//! │       │                                                                 │
//! │       │  db.drawers().append_event(&event, expected_version)           │
//! │       ▼                                                                 │
//! │  DrawerRepository                                                      │
//! │  ├── load_current(&self, drawer_id)                                    │
//! │  ├── start_session(&self, session)                                     │
//! │  ├── append_event(&self, event, expected_version)                      │
//! │  ├── close_session(&self, session, expected_version)                   │
//! │  ├── stored_version(&self, drawer_id)                                  │
//! │  └── delete_session(&self, session_id, expected_version)               │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`drawer::DrawerRepository`] - Drawer sessions and their event logs
//! - [`sync::SyncOutboxRepository`] - Sync queue management

pub mod drawer;
pub mod sync;
