//! airhub - command-line access to the local reading history.

mod cli;
mod commands;
mod config;
mod format;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use airhub_store::Store;

use crate::cli::{Cli, Commands};
use crate::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON and CSV on stdout stay clean
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Runs before loading, so a broken config can be replaced
    if let Commands::InitConfig { force } = cli.command {
        return commands::cmd_init_config(cli.config.as_deref(), force);
    }

    let config = Config::load_or_default(cli.config.as_deref()).context("Failed to load config")?;
    config.validate()?;

    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.storage.path.clone());
    tracing::debug!("Using database {}", db_path.display());
    let store = Store::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let result = run(cli.command, &store, &config);
    store.close();
    result
}

fn run(command: Commands, store: &Store, config: &Config) -> Result<()> {
    match command {
        Commands::Ingest { input } => commands::cmd_ingest(store, input.as_deref()),
        Commands::Put {
            device,
            name,
            room,
            reading_type,
            value,
            at,
        } => commands::cmd_put(
            store,
            &device,
            name.as_deref(),
            room.as_deref(),
            reading_type,
            value,
            at.as_deref(),
        ),
        Commands::Query {
            filter,
            limit,
            offset,
            format,
        } => commands::cmd_query(store, &filter, limit, offset, format),
        Commands::Latest {
            device,
            reading_type,
            format,
        } => commands::cmd_latest(store, &device, reading_type, format),
        Commands::Stats {
            reading_type,
            scope,
            format,
        } => commands::cmd_stats(store, reading_type, &scope, format),
        Commands::Devices { format } => commands::cmd_devices(store, format),
        Commands::Info => commands::cmd_info(store),
        Commands::Sweep { if_due } => commands::cmd_sweep(store, config, if_due),
        Commands::Delete { id } => commands::cmd_delete(store, id),
        Commands::Clear { yes } => commands::cmd_clear(store, yes),
        Commands::Export {
            filter,
            format,
            output,
        } => commands::cmd_export(store, &filter, format, output.as_deref()),
        Commands::Import { format, input } => {
            commands::cmd_import(store, format, input.as_deref())
        }
        Commands::InitConfig { .. } => unreachable!("handled before the store is opened"),
    }
}
