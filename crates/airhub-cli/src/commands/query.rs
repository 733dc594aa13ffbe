//! Read-only commands over stored readings.

use anyhow::{Context, Result};

use airhub_store::Store;
use airhub_types::ReadingType;

use crate::cli::{FilterArgs, OutputFormat, ScopeArgs};
use crate::format::{format_devices, format_readings, format_statistics};

use super::{build_query, scoped_query};

/// Execute the query command.
pub fn cmd_query(
    store: &Store,
    filter: &FilterArgs,
    limit: Option<u32>,
    offset: Option<u32>,
    format: OutputFormat,
) -> Result<()> {
    let mut query = build_query(filter)?;
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    if let Some(offset) = offset {
        query = query.offset(offset);
    }

    let readings = store.query_stored(&query).context("Query failed")?;
    print!("{}", format_readings(&readings, format)?);
    Ok(())
}

/// Execute the latest command.
pub fn cmd_latest(
    store: &Store,
    device: &str,
    reading_type: ReadingType,
    format: OutputFormat,
) -> Result<()> {
    let readings: Vec<_> = store
        .latest_stored(device, reading_type)?
        .into_iter()
        .collect();

    if readings.is_empty() && format == OutputFormat::Text {
        println!("No {} reading stored for {}", reading_type, device);
        return Ok(());
    }

    print!("{}", format_readings(&readings, format)?);
    Ok(())
}

/// Execute the stats command.
pub fn cmd_stats(
    store: &Store,
    reading_type: ReadingType,
    scope: &ScopeArgs,
    format: OutputFormat,
) -> Result<()> {
    let query = scoped_query(scope)?;

    match store.statistics(&query, reading_type)? {
        Some(stats) => print!("{}", format_statistics(&stats, format)?),
        None if format == OutputFormat::Json => println!("null"),
        None => println!("No {} readings found", reading_type),
    }
    Ok(())
}

/// Execute the devices command.
pub fn cmd_devices(store: &Store, format: OutputFormat) -> Result<()> {
    let devices = store.devices()?;
    print!("{}", format_devices(&devices, format)?);
    Ok(())
}
