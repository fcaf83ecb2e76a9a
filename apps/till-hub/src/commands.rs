//! # CLI Commands
//!
//! Subcommands of the `till-hub` binary. Each prints one JSON document on
//! stdout; errors go through `anyhow` to stderr with a non-zero exit.
//!
//! ```bash
//! till-hub open front-1 200
//! till-hub event front-1 cash_out 50 safe drop
//! till-hub event front-1 cash_in 20 change fund
//! till-hub status front-1            # runningBalance: 17000
//! till-hub close front-1 165         # overShort: -500
//! till-hub clear front-1
//! ```

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::debug;

use crate::config::HubConfig;
use crate::error::{ApiError, ApiResult};
use crate::service::DrawerService;
use till_core::{CashEventType, Money};

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "till-hub", version, about = "Cash drawer sessions for Till terminals")]
pub struct Cli {
    /// Config file (default: platform config dir / till.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding config and TILL_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start a session (replaces any existing one)
    Open {
        drawer: String,
        /// Opening float, e.g. 200 or 200.00 (default from config)
        float: Option<Money>,
    },

    /// Record a cash movement
    Event {
        drawer: String,
        /// opening, cash_in, paid_in, cash_out, paid_out or safe_drop
        #[arg(value_name = "TYPE")]
        event_type: CashEventType,
        /// Positive amount, e.g. 50 or 12.75
        amount: Money,
        /// Why the cash moved
        #[arg(required = true, num_args = 1..)]
        reason: Vec<String>,
    },

    /// Count the drawer and close the session
    Close {
        drawer: String,
        /// Counted cash
        counted: Money,
    },

    /// Discard the drawer's session
    Clear { drawer: String },

    /// Show one drawer, or every drawer with a session
    Status { drawer: Option<String> },

    /// Print the effective configuration
    Config,
}

/// Runs a parsed command line and prints its result.
pub async fn run(cli: Cli, config: HubConfig) -> anyhow::Result<()> {
    if cli.command == Command::Config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let db = crate::connect(&config).await?;
    let service = DrawerService::new(db.clone());

    let result = execute(&service, &config, cli.command).await;
    db.close().await;

    let value = result?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Executes one command against the service.
pub async fn execute(
    service: &DrawerService,
    config: &HubConfig,
    command: Command,
) -> ApiResult<Value> {
    debug!(?command, "Executing command");

    match command {
        Command::Open { drawer, float } => {
            let float = float.unwrap_or_else(|| config.default_opening_float());
            to_json(&service.open_drawer(&drawer, float).await?)
        }

        Command::Event {
            drawer,
            event_type,
            amount,
            reason,
        } => {
            let event = service
                .add_event(&drawer, event_type, amount, &reason.join(" "))
                .await?;
            let balance = service.running_balance(&drawer).await?;
            Ok(json!({
                "event": to_json(&event)?,
                "runningBalance": to_json(&balance)?,
            }))
        }

        Command::Close { drawer, counted } => to_json(&service.close_drawer(&drawer, counted).await?),

        Command::Clear { drawer } => {
            let cleared = service.clear_session(&drawer).await?;
            Ok(json!({ "drawerId": drawer, "cleared": cleared }))
        }

        Command::Status { drawer: Some(drawer) } => to_json(&service.get_drawer(&drawer).await?),

        Command::Status { drawer: None } => {
            let drawers = service.list_drawers().await?;
            let pending = service.pending_sync_count().await?;
            Ok(json!({
                "drawers": to_json(&drawers)?,
                "pendingSync": pending,
            }))
        }

        Command::Config => to_json(config),
    }
}

fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::internal(e.to_string()))
}
