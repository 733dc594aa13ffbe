//! Command implementations for the CLI.

mod ingest;
mod maintenance;
mod query;
mod transfer;

pub use ingest::{cmd_ingest, cmd_put};
pub use maintenance::{cmd_clear, cmd_delete, cmd_info, cmd_init_config, cmd_sweep};
pub use query::{cmd_devices, cmd_latest, cmd_query, cmd_stats};
pub use transfer::{cmd_export, cmd_import};

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use time::OffsetDateTime;

use airhub_store::ReadingQuery;

use crate::cli::{FilterArgs, ScopeArgs};

/// Parse an RFC3339 timestamp or a `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn parse_datetime(s: &str) -> Result<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339) {
        return Ok(dt);
    }

    let format = time::format_description::parse("[year]-[month]-[day]")?;
    if let Ok(date) = time::Date::parse(s, &format) {
        return Ok(date.midnight().assume_utc());
    }

    anyhow::bail!("Invalid date/time format: {}. Use RFC3339 or YYYY-MM-DD", s)
}

/// Build a store query from the shared filter flags.
pub(crate) fn build_query(filter: &FilterArgs) -> Result<ReadingQuery> {
    Ok(scoped_query(&filter.scope)?.types(filter.types.iter().copied()))
}

/// Build a store query from device, room and time window flags.
pub(crate) fn scoped_query(scope: &ScopeArgs) -> Result<ReadingQuery> {
    let mut query = ReadingQuery::new();

    if let Some(device) = &scope.device {
        query = query.device(device);
    }
    if let Some(room) = &scope.room {
        query = query.room(room);
    }
    if let Some(since) = &scope.since {
        query = query.since(parse_datetime(since)?);
    }
    if let Some(until) = &scope.until {
        query = query.until(parse_datetime(until)?);
    }

    Ok(query)
}

/// Read a whole file, or stdin when no path is given.
pub(crate) fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            Ok(buffer)
        }
    }
}
