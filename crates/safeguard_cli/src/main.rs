//! `safeguard` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, load configuration and wire the core with simulated
//!   platform capabilities.
//! - Keep output plain and line-oriented.

mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use log::debug;
use cli::{Cli, Commands};
use safeguard_core::CoreConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CoreConfig::default(),
    };
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    if config.db_path.is_none() {
        config.db_path = Some(commands::DEFAULT_DB_FILE.into());
    }
    safeguard_core::init_from_config(&config).map_err(anyhow::Error::msg)?;
    debug!(
        "event=cli_start module=cli status=ok db_path={}",
        config
            .db_path
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_default()
    );

    match cli.command {
        Commands::Ping => {
            println!("safeguard_core ping={}", safeguard_core::ping());
            println!("safeguard_core version={}", safeguard_core::core_version());
            Ok(())
        }
        Commands::Contacts { action } => commands::run_contacts(&config, action),
        Commands::Items { action } => commands::run_items(&config, action),
        Commands::Todos { action } => commands::run_todos(&config, action),
        Commands::Drill { seconds, lat, lon } => {
            commands::run_drill(&config, seconds, lat, lon).await
        }
        Commands::Export { output } => commands::run_export(&config, output.as_deref()),
        Commands::Import { file } => commands::run_import(&config, &file),
    }
}
