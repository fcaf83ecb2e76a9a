//! Till hub command line.

use clap::Parser;

use till_hub::commands::{self, Cli};
use till_hub::config::HubConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = HubConfig::load(cli.config.clone())?;
    if let Some(db) = &cli.db {
        config.database.path = Some(db.clone());
    }

    till_hub::init_tracing(&config.logging.filter);

    commands::run(cli, config).await
}
