//! Error types for airhub-store.

use std::path::PathBuf;

use airhub_types::ParseError;
use time::OffsetDateTime;

/// Result type for airhub-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in airhub-store.
///
/// Failures from the storage engine are surfaced as-is and never retried
/// internally; the caller knows whether a retry makes sense.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any failure reported by the storage engine.
    ///
    /// Besides open, read and write failures this also carries constraint
    /// violations and other SQL errors raised by SQLite.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Query time range whose start is after its end.
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },

    /// Reading rejected before it reached the database.
    #[error("Invalid reading: {0}")]
    InvalidReading(#[from] ParseError),

    /// Timestamp outside the storable range.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Stored row that cannot be decoded back into a reading.
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: i64, reason: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error came from the storage engine rather than the input.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::CreateDirectory { .. } | Error::Io(_)
        )
    }
}
