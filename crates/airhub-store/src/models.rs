//! Data models for stored data.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use airhub_types::{Reading, ReadingType};

use crate::error::Error;

/// Surrogate identifier assigned to a reading when it is stored.
///
/// Ids increase monotonically and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reading together with the id it was stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    /// Database row ID.
    pub id: RecordId,
    /// The reading itself.
    #[serde(flatten)]
    pub reading: Reading,
}

/// A reading that could not be stored as part of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Position of the reading in the submitted batch.
    pub index: usize,
    /// Why it was rejected.
    pub error: Error,
}

/// Per-record outcome of [`Store::put_batch`](crate::Store::put_batch).
///
/// Readings are independent facts, so a failure never rolls back the
/// readings that were stored before it.
#[derive(Debug, Default)]
pub struct BatchResult {
    /// `(batch index, id)` for every stored reading, in batch order.
    pub inserted: Vec<(usize, RecordId)>,
    /// Readings that were rejected, in batch order.
    pub failed: Vec<BatchFailure>,
}

impl BatchResult {
    /// Whether every reading in the batch was stored.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of the stored readings.
    pub fn ids(&self) -> Vec<RecordId> {
        self.inserted.iter().map(|(_, id)| *id).collect()
    }

    /// Number of readings stored.
    pub fn inserted_count(&self) -> usize {
        self.inserted.len()
    }
}

/// Summary of one device's stored readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    /// Device identifier.
    pub device_id: String,
    /// Display name from the device's most recent reading.
    pub device_name: String,
    /// Room from the device's most recent reading.
    pub room_name: Option<String>,
    /// Number of stored readings.
    pub reading_count: u64,
    /// Timestamp of the most recent reading.
    #[serde(with = "time::serde::rfc3339")]
    pub last_seen: OffsetDateTime,
}

/// Result of an import operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    /// Rows parsed and stored.
    pub imported: usize,
    /// Rows that could not be parsed or stored.
    pub failed: usize,
    /// Messages describing the failures, prefixed with the row number.
    pub errors: Vec<String>,
}

/// Row layout shared by CSV export and import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CsvRow {
    pub device_id: String,
    pub device_name: String,
    pub room_name: Option<String>,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub reading_type: ReadingType,
    pub value: f64,
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_record_id_display_and_order() {
        assert_eq!(RecordId(42).to_string(), "42");
        assert!(RecordId(1) < RecordId(2));
    }

    #[test]
    fn test_stored_reading_serializes_flat() {
        let stored = StoredReading {
            id: RecordId(7),
            reading: Reading::new(
                "d1",
                "Office",
                datetime!(2025-05-01 10:00 UTC),
                ReadingType::Humidity,
                41.0,
            ),
        };
        let json = serde_json::to_string(&stored).unwrap();
        assert!(json.contains("\"id\":7"));
        assert!(json.contains("\"deviceId\":\"d1\""));
        assert!(json.contains("\"unit\":\"%\""));
    }

    #[test]
    fn test_batch_result_accessors() {
        let result = BatchResult {
            inserted: vec![(0, RecordId(10)), (2, RecordId(11))],
            failed: vec![BatchFailure {
                index: 1,
                error: Error::InvalidTimestamp("out of range".to_string()),
            }],
        };
        assert!(!result.is_complete());
        assert_eq!(result.ids(), vec![RecordId(10), RecordId(11)]);
        assert_eq!(result.inserted_count(), 2);
        assert!(BatchResult::default().is_complete());
    }
}
