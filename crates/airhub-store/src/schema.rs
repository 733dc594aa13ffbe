//! Database schema and migrations.

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Index on `device_id` alone.
pub const IDX_DEVICE: &str = "idx_readings_device";
/// Index on `timestamp`.
pub const IDX_TIMESTAMP: &str = "idx_readings_timestamp";
/// Composite index on `(device_id, timestamp)`.
pub const IDX_DEVICE_TIME: &str = "idx_readings_device_time";
/// Index on `type`.
pub const IDX_TYPE: &str = "idx_readings_type";

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        // Fresh database - create all tables
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
        debug!("Created schema version {}", SCHEMA_VERSION);
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
///
/// Timestamps are unix nanoseconds. `AUTOINCREMENT` keeps record ids
/// strictly increasing even after the newest rows are deleted.
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS readings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            device_name TEXT NOT NULL,
            room_name TEXT,
            timestamp INTEGER NOT NULL,
            type TEXT NOT NULL,
            value REAL NOT NULL,
            unit TEXT NOT NULL,
            CHECK (
                (type = 'temperature' AND unit = '°C') OR
                (type = 'humidity' AND unit = '%') OR
                (type = 'pm25' AND unit = 'μg/m³') OR
                (type = 'voc' AND unit = 'index')
            )
        );
        CREATE INDEX IF NOT EXISTS idx_readings_device
            ON readings(device_id);
        CREATE INDEX IF NOT EXISTS idx_readings_timestamp
            ON readings(timestamp);
        CREATE INDEX IF NOT EXISTS idx_readings_device_time
            ON readings(device_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_readings_type
            ON readings(type);

        -- House-keeping values (last sweep time, ...)
        CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}

/// Run migrations from old_version to current.
fn migrate(conn: &Connection, old_version: i32) -> Result<()> {
    debug!(
        "Migrating schema from version {} to {}",
        old_version, SCHEMA_VERSION
    );
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}
