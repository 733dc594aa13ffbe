//! Local time-series store for airhub sensor readings.
//!
//! Readings are kept in SQLite, one row per typed value, so any subset of
//! measurement types can be queried, aggregated and aged out independently.
//!
//! # Features
//!
//! - Store single readings, batches and whole device snapshots
//! - Query by device, room, reading type and inclusive time range, with
//!   pagination, newest first
//! - Concurrent reads alongside a single serialized writer
//! - 30 day retention with chunked sweeps
//! - Per-type statistics and store totals
//! - CSV and JSON export/import
//!
//! # Example
//!
//! ```no_run
//! use airhub_store::{ReadingQuery, Store};
//! use airhub_types::ReadingType;
//! use time::{Duration, OffsetDateTime};
//!
//! let store = Store::open_default()?;
//! let now = OffsetDateTime::now_utc();
//!
//! let query = ReadingQuery::new()
//!     .device("hub-living-room")
//!     .reading_type(ReadingType::Pm25)
//!     .range(now - Duration::days(1), now)
//!     .limit(10);
//! let readings = store.query(&query)?;
//!
//! store.sweep(now)?;
//! # Ok::<(), airhub_store::Error>(())
//! ```

mod connection;
mod error;
mod export;
mod models;
mod queries;
mod retention;
mod schema;
mod stats;
mod store;

pub use error::{Error, Result};
pub use models::{
    BatchFailure, BatchResult, DeviceSummary, ImportResult, RecordId, StoredReading,
};
pub use queries::{AccessPath, ReadingQuery};
pub use retention::{DEFAULT_CHUNK_SIZE, RETENTION_DAYS, RetentionPolicy, SweepReport};
pub use stats::{Statistics, StorageStats};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/airhub/readings.db`
/// - macOS: `~/Library/Application Support/airhub/readings.db`
/// - Windows: `C:\Users\<user>\AppData\Local\airhub\readings.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("airhub")
        .join("readings.db")
}
