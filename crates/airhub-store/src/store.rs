//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use airhub_types::{DeviceSnapshot, Reading, ReadingType};

use crate::connection::{Connections, Location};
use crate::error::{Error, Result};
use crate::models::{BatchFailure, BatchResult, DeviceSummary, RecordId, StoredReading};
use crate::queries::{READING_COLUMNS, ReadingQuery, decode_timestamp, encode_bound, encode_timestamp};

const INSERT_READING: &str = "INSERT INTO readings
     (device_id, device_name, room_name, timestamp, type, value, unit)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

/// SQLite-backed store for sensor readings.
///
/// The store is the only owner of the readings it holds: callers insert,
/// query and delete through this handle and never touch the database
/// directly. One handle is meant to be created at startup and shared
/// (it is `Send + Sync`); writes are serialized internally.
pub struct Store {
    conns: Connections,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conns = Connections::new(Location::File(path.as_ref().to_path_buf()));
        conns.ensure_open()?;
        Ok(Self { conns })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conns = Connections::new(Location::Memory);
        conns.ensure_open()?;
        Ok(Self { conns })
    }

    /// Path of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.conns.path()
    }

    /// Release the database connections.
    ///
    /// The handle stays usable: the next operation reopens the database.
    /// Closing an in-memory store discards its contents.
    pub fn close(&self) {
        self.conns.close();
    }

    pub(crate) fn connections(&self) -> &Connections {
        &self.conns
    }
}

// Write operations
impl Store {
    /// Insert a reading and return its new id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidReading`] or [`Error::InvalidTimestamp`] for input
    /// that cannot be stored, [`Error::StorageUnavailable`] when the
    /// database cannot be opened or written.
    pub fn put(&self, reading: &Reading) -> Result<RecordId> {
        let id = self.conns.with_writer(|conn| insert_row(conn, reading))?;
        debug!(
            "Stored {} reading for {} as {}",
            reading.reading_type, reading.device_id, id
        );
        Ok(id)
    }

    /// Insert several readings, reporting the outcome of each.
    ///
    /// The batch holds the writer for its whole duration, so concurrent
    /// batches never interleave, but every reading is committed on its own:
    /// a failure leaves the readings before it stored.
    ///
    /// # Errors
    ///
    /// Only fails as a whole when the database cannot be opened.
    pub fn put_batch(&self, readings: &[Reading]) -> Result<BatchResult> {
        if readings.is_empty() {
            debug!("Ignoring empty batch");
            return Ok(BatchResult::default());
        }

        let result = self.conns.with_writer(|conn| {
            let mut result = BatchResult::default();
            for (index, reading) in readings.iter().enumerate() {
                match insert_row(conn, reading) {
                    Ok(id) => result.inserted.push((index, id)),
                    Err(error) => {
                        warn!(
                            "Failed to store reading {} of batch ({} for {}): {}",
                            index, reading.reading_type, reading.device_id, error
                        );
                        result.failed.push(BatchFailure { index, error });
                    }
                }
            }
            Ok(result)
        })?;

        debug!(
            "Stored {} of {} readings in batch",
            result.inserted.len(),
            readings.len()
        );
        Ok(result)
    }

    /// Decompose a device snapshot and store its readings.
    pub fn ingest(&self, snapshot: &DeviceSnapshot) -> Result<BatchResult> {
        let readings = snapshot.readings();
        debug!(
            "Ingesting snapshot from {} with {} measurement(s)",
            snapshot.device_id,
            readings.len()
        );
        self.put_batch(&readings)
    }

    /// Delete a reading by id. Returns the number of readings removed.
    ///
    /// Deleting an id that does not exist removes nothing and is not an error.
    pub fn delete(&self, id: RecordId) -> Result<u64> {
        let removed = self.conns.with_writer(|conn| {
            Ok(conn.execute("DELETE FROM readings WHERE id = ?1", [id.0])?)
        })?;
        Ok(removed as u64)
    }

    /// Delete every reading with `timestamp <= cutoff`.
    pub fn delete_where(&self, cutoff: OffsetDateTime) -> Result<u64> {
        let cutoff = encode_bound(cutoff);
        let removed = self.conns.with_writer(|conn| {
            Ok(conn.execute("DELETE FROM readings WHERE timestamp <= ?1", [cutoff])?)
        })?;
        info!("Deleted {} reading(s) up to cutoff", removed);
        Ok(removed as u64)
    }

    /// Remove all readings.
    pub fn clear(&self) -> Result<u64> {
        let removed = self
            .conns
            .with_writer(|conn| Ok(conn.execute("DELETE FROM readings", [])?))?;
        info!("Cleared {} reading(s)", removed);
        Ok(removed as u64)
    }
}

// Read operations
impl Store {
    /// Query readings, newest first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRange`] when the query's range starts after it ends,
    /// [`Error::StorageUnavailable`] when the database cannot be read.
    pub fn query(&self, query: &ReadingQuery) -> Result<Vec<Reading>> {
        Ok(self
            .query_stored(query)?
            .into_iter()
            .map(|stored| stored.reading)
            .collect())
    }

    /// Query readings together with their record ids.
    pub fn query_stored(&self, query: &ReadingQuery) -> Result<Vec<StoredReading>> {
        query.validate()?;

        let sql = query.build_sql();
        let (_, params) = query.build_where();
        debug!("Executing query via {}: {}", query.access_path(), sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let rows = self.conns.with_reader(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_ref.as_slice(), RawRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter().map(RawRow::decode).collect()
    }

    /// The most recent reading of one type from one device.
    ///
    /// Returns `Ok(None)` when the device has no reading of that type.
    pub fn latest_reading(
        &self,
        device_id: &str,
        reading_type: ReadingType,
    ) -> Result<Option<Reading>> {
        Ok(self
            .latest_stored(device_id, reading_type)?
            .map(|stored| stored.reading))
    }

    /// Like [`Store::latest_reading`], but keeps the record id.
    pub fn latest_stored(
        &self,
        device_id: &str,
        reading_type: ReadingType,
    ) -> Result<Option<StoredReading>> {
        let query = ReadingQuery::new()
            .device(device_id)
            .reading_type(reading_type)
            .limit(1);
        Ok(self.query_stored(&query)?.into_iter().next())
    }

    /// Fetch a single reading by id.
    pub fn get(&self, id: RecordId) -> Result<Option<StoredReading>> {
        let sql = format!("SELECT {} FROM readings WHERE id = ?1", READING_COLUMNS);
        let row = self.conns.with_reader(|conn| {
            Ok(conn
                .query_row(&sql, [id.0], RawRow::from_row)
                .optional()?)
        })?;
        row.map(RawRow::decode).transpose()
    }

    /// Count readings, optionally for a single device.
    pub fn count(&self, device_id: Option<&str>) -> Result<u64> {
        let count: i64 = self.conns.with_reader(|conn| {
            Ok(match device_id {
                Some(id) => conn.query_row(
                    "SELECT COUNT(*) FROM readings WHERE device_id = ?",
                    [id],
                    |row| row.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?,
            })
        })?;

        Ok(count as u64)
    }

    /// List the devices that have stored readings, most recently seen first.
    pub fn devices(&self) -> Result<Vec<DeviceSummary>> {
        // With a single MAX() aggregate SQLite takes the bare columns from the
        // row holding the maximum, i.e. the device's latest reading.
        let rows = self.conns.with_reader(|conn| {
            let mut stmt = conn.prepare(
                "SELECT device_id, device_name, room_name, MAX(timestamp), COUNT(*)
                 FROM readings GROUP BY device_id ORDER BY 4 DESC, device_id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(device_id, device_name, room_name, last_seen, count)| {
                let last_seen = decode_timestamp(last_seen).ok_or_else(|| {
                    Error::InvalidTimestamp(format!(
                        "latest timestamp {} of device {} is out of range",
                        last_seen, device_id
                    ))
                })?;
                Ok(DeviceSummary {
                    device_id,
                    device_name,
                    room_name,
                    reading_count: count as u64,
                    last_seen,
                })
            })
            .collect()
    }
}

// House-keeping values
impl Store {
    pub(crate) fn get_meta(&self, key: &str) -> Result<Option<i64>> {
        self.conns.with_reader(|conn| {
            Ok(conn
                .query_row("SELECT value FROM store_meta WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?)
        })
    }

    pub(crate) fn set_meta(&self, key: &str, value: i64) -> Result<()> {
        self.conns.with_writer(|conn| {
            conn.execute(
                "INSERT INTO store_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = ?2",
                rusqlite::params![key, value],
            )?;
            Ok(())
        })
    }
}

fn insert_row(conn: &Connection, reading: &Reading) -> Result<RecordId> {
    reading.validate()?;
    let timestamp = encode_timestamp(reading.timestamp)?;

    let mut stmt = conn.prepare_cached(INSERT_READING)?;
    stmt.execute(rusqlite::params![
        reading.device_id,
        reading.device_name,
        reading.room_name,
        timestamp,
        reading.reading_type.as_str(),
        reading.value,
        reading.unit(),
    ])?;

    Ok(RecordId(conn.last_insert_rowid()))
}

/// A `readings` row before validation.
struct RawRow {
    id: i64,
    device_id: String,
    device_name: String,
    room_name: Option<String>,
    timestamp: i64,
    reading_type: String,
    value: f64,
    unit: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            device_id: row.get(1)?,
            device_name: row.get(2)?,
            room_name: row.get(3)?,
            timestamp: row.get(4)?,
            reading_type: row.get(5)?,
            value: row.get(6)?,
            unit: row.get(7)?,
        })
    }

    fn decode(self) -> Result<StoredReading> {
        let id = self.id;
        let corrupt = |reason: String| {
            warn!("Corrupt reading row {}: {}", id, reason);
            Error::CorruptRecord { id, reason }
        };

        let reading_type: ReadingType = self
            .reading_type
            .parse()
            .map_err(|e: airhub_types::ParseError| corrupt(e.to_string()))?;
        reading_type
            .check_unit(&self.unit)
            .map_err(|e| corrupt(e.to_string()))?;
        let timestamp = decode_timestamp(self.timestamp)
            .ok_or_else(|| corrupt(format!("timestamp {} out of range", self.timestamp)))?;

        Ok(StoredReading {
            id: RecordId(id),
            reading: Reading {
                device_id: self.device_id,
                device_name: self.device_name,
                room_name: self.room_name,
                timestamp,
                reading_type,
                value: self.value,
            },
        })
    }
}
