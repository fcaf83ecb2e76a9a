//! # Till Hub Library
//!
//! Drawer hub for Till: owns one cash drawer per id, persists every change
//! before it becomes visible, and exposes the operations to terminals.
//!
//! ## Module Organization
//! ```text
//! till_hub/
//! ├── lib.rs          ◄─── You are here (startup helpers)
//! ├── config.rs       ◄─── HubConfig: defaults → till.toml → TILL_* env
//! ├── error.rs        ◄─── ApiError / ErrorCode for terminals
//! ├── service.rs      ◄─── DrawerService (open, event, close, clear, ...)
//! ├── state/
//! │   └── registry.rs ◄─── DrawerRegistry: drawer id → per-drawer lock
//! └── commands.rs     ◄─── CLI subcommands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. HubConfig::load(--config)                                          │
//! │  2. init_tracing(config.logging.filter)  (RUST_LOG wins)               │
//! │  3. connect(&config) → Database (WAL, migrations)                      │
//! │  4. DrawerService::new(db)                                             │
//! │  5. Run the requested command, print JSON                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod service;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use config::HubConfig;
use till_db::{Database, DbConfig};

pub use error::{ApiError, ApiResult, ErrorCode};
pub use service::{DrawerService, DrawerSnapshot};

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Logs go to stderr so
/// command output on stdout stays machine-readable.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Opens the configured database and runs pending migrations.
pub async fn connect(config: &HubConfig) -> anyhow::Result<Database> {
    let path = config.database_path()?;
    info!(?path, "Database path determined");

    let db = Database::new(DbConfig::new(path).max_connections(config.database.max_connections))
        .await?;

    info!("Database connected and migrations applied");
    Ok(db)
}
