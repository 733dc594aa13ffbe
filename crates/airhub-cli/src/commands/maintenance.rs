//! Maintenance commands - info, retention and deletion.

use std::path::Path;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use airhub_store::{RETENTION_DAYS, RecordId, Store};

use crate::config::{Config, default_config_path};
use crate::format::format_timestamp;

/// Execute the info command.
pub fn cmd_info(store: &Store) -> Result<()> {
    if let Some(path) = store.path() {
        println!("Database path: {}", path.display());
        if path.exists() {
            let metadata = std::fs::metadata(path)?;
            println!("Database size: {} KB", metadata.len() / 1024);
        }
    }

    let stats = store.storage_stats().context("Failed to read store totals")?;
    println!("Readings:      {}", stats.total_readings);
    println!("Devices:       {}", stats.device_count);
    if let (Some(earliest), Some(latest)) = (stats.earliest, stats.latest) {
        println!(
            "Time range:    {} to {}",
            format_timestamp(earliest)?,
            format_timestamp(latest)?
        );
    }
    println!("Retention:     {} days", RETENTION_DAYS);
    if let Some(last) = store.last_sweep_at()? {
        println!("Last sweep:    {}", format_timestamp(last)?);
    }

    Ok(())
}

/// Execute the sweep command.
pub fn cmd_sweep(store: &Store, config: &Config, if_due: bool) -> Result<()> {
    let now = OffsetDateTime::now_utc();
    let policy = config.retention.policy();

    let report = if if_due {
        match store.sweep_if_due(now, config.retention.min_sweep_interval(), &policy)? {
            Some(report) => report,
            None => {
                println!("Sweep not due yet");
                return Ok(());
            }
        }
    } else {
        store.sweep_with(now, &policy).context("Retention sweep failed")?
    };

    println!(
        "Removed {} reading(s) at or before {}",
        report.deleted,
        format_timestamp(report.cutoff)?
    );
    Ok(())
}

/// Execute the delete command.
pub fn cmd_delete(store: &Store, id: i64) -> Result<()> {
    let removed = store.delete(RecordId(id))?;
    if removed == 0 {
        println!("No reading with id {}", id);
    } else {
        println!("Deleted reading {}", id);
    }
    Ok(())
}

/// Execute the clear command.
pub fn cmd_clear(store: &Store, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to delete every reading without --yes");
    }
    let removed = store.clear()?;
    println!("Deleted {} reading(s)", removed);
    Ok(())
}

/// Execute the init-config command.
pub fn cmd_init_config(path: Option<&Path>, force: bool) -> Result<()> {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    if path.exists() && !force {
        anyhow::bail!(
            "Config file {} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
