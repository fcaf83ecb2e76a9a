//! # Drawer Reconciliation Report
//!
//! Prints the persisted session of one drawer, or of every drawer.
//!
//! ## Usage
//! ```bash
//! # All drawers in the default database
//! cargo run -p till-db --bin report
//!
//! # One drawer, as JSON
//! cargo run -p till-db --bin report -- --db ./data/till.db --drawer front-1 --json
//!
//! # Closed sessions still waiting for the uploader
//! cargo run -p till-db --bin report -- --pending 20
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use till_core::{DrawerSession, DrawerSummary, Variance};
use till_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "report", about = "Print drawer reconciliations from a Till database")]
struct Args {
    /// Path to the SQLite database
    #[arg(long, default_value = "./till.db")]
    db: PathBuf,

    /// Only report this drawer
    #[arg(long)]
    drawer: Option<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,

    /// List up to N outbox entries waiting to sync
    #[arg(long, value_name = "N")]
    pending: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Reports never create or migrate a database.
    if !args.db.exists() {
        anyhow::bail!("database not found: {}", args.db.display());
    }
    let db = Database::new(DbConfig::new(&args.db).run_migrations(false))
        .await
        .with_context(|| format!("opening {}", args.db.display()))?;
    let drawers = db.drawers();

    let drawer_ids = match args.drawer {
        Some(id) => vec![id],
        None => drawers.list_drawer_ids().await?,
    };

    let mut summaries = Vec::new();
    for drawer_id in &drawer_ids {
        match drawers.load_current(drawer_id).await? {
            Some(session) => summaries.push((DrawerSummary::of(&session), session)),
            None => eprintln!("{}: no session", drawer_id),
        }
    }

    if args.json {
        let json: Vec<&DrawerSummary> = summaries.iter().map(|(s, _)| s).collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for (summary, session) in &summaries {
            print_summary(summary, session);
        }
    }

    let outbox = db.sync_outbox();
    if let Some(limit) = args.pending {
        for entry in outbox.get_pending(limit).await? {
            eprintln!(
                "pending {} {} (attempts: {}{})",
                entry.entity_type,
                entry.entity_id,
                entry.attempts,
                entry
                    .last_error
                    .as_deref()
                    .map(|e| format!(", last error: {}", e))
                    .unwrap_or_default()
            );
        }
    }

    let pending = outbox.pending_count().await?;
    eprintln!("{} session(s) waiting to sync", pending);

    db.close().await;
    Ok(())
}

fn print_summary(summary: &DrawerSummary, session: &DrawerSession) {
    println!("Drawer {} ({})", summary.drawer_id, summary.status);
    println!("  session   {}", summary.session_id);
    println!("  opened    {}", session.opened_at.to_rfc3339());
    println!("  float     {:>12}", summary.opening_float.to_string());

    for event in session.events() {
        println!(
            "  #{:<3} {:<10} {:>12}  {}",
            event.sequence,
            event.event_type.as_str(),
            event.signed_amount().to_string(),
            event.reason
        );
    }

    println!("  in        {:>12}", summary.totals.inflow.to_string());
    println!("  out       {:>12}", summary.totals.outflow.to_string());
    println!("  expected  {:>12}", summary.expected.to_string());

    if let (Some(actual), Some(over_short), Some(variance)) =
        (summary.actual_cash, summary.over_short, summary.variance)
    {
        let label = match variance {
            Variance::Over => "over",
            Variance::Short => "short",
            Variance::Exact => "exact",
        };
        println!("  counted   {:>12}", actual.to_string());
        println!("  variance  {:>12}  {}", over_short.to_string(), label);
    }
    println!();
}
