//! Aggregate statistics over stored readings.

use serde::Serialize;
use time::OffsetDateTime;

use airhub_types::{Reading, ReadingType, TimeRange};

use crate::error::Result;
use crate::queries::{ReadingQuery, decode_timestamp};
use crate::store::Store;

/// Summary of the values of one reading type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub reading_type: ReadingType,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
    pub count: usize,
    /// Oldest and newest timestamp among the aggregated readings.
    pub time_range: TimeRange,
}

impl Statistics {
    /// Aggregate the readings of `reading_type`, ignoring any other type.
    ///
    /// Returns `None` when no reading of that type is present. The median of
    /// an even number of values is the mean of the two middle values.
    pub fn compute(reading_type: ReadingType, readings: &[Reading]) -> Option<Self> {
        let matching: Vec<&Reading> = readings
            .iter()
            .filter(|r| r.reading_type == reading_type)
            .collect();
        let first = matching.first()?;

        let mut values: Vec<f64> = matching.iter().map(|r| r.value).collect();
        values.sort_by(f64::total_cmp);

        let count = values.len();
        let sum: f64 = values.iter().sum();
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        let (mut start, mut end) = (first.timestamp, first.timestamp);
        for reading in &matching {
            start = start.min(reading.timestamp);
            end = end.max(reading.timestamp);
        }

        Some(Self {
            reading_type,
            min: values[0],
            max: values[count - 1],
            average: sum / count as f64,
            median,
            count,
            time_range: TimeRange { start, end },
        })
    }
}

/// Overall contents of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub total_readings: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub earliest: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub latest: Option<OffsetDateTime>,
    pub device_count: u64,
}

// Aggregation
impl Store {
    /// Statistics for one reading type over the readings matching `query`.
    ///
    /// The query's own type filter is replaced by `reading_type`; its
    /// pagination still applies.
    pub fn statistics(
        &self,
        query: &ReadingQuery,
        reading_type: ReadingType,
    ) -> Result<Option<Statistics>> {
        let mut query = query.clone();
        query.types = vec![reading_type];
        let readings = self.query(&query)?;
        Ok(Statistics::compute(reading_type, &readings))
    }

    /// Totals across the whole store.
    pub fn storage_stats(&self) -> Result<StorageStats> {
        let (total, earliest, latest, devices) = self.connections().with_reader(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*), MIN(timestamp), MAX(timestamp), COUNT(DISTINCT device_id)
                 FROM readings",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?)
        })?;

        Ok(StorageStats {
            total_readings: total as u64,
            earliest: earliest.and_then(decode_timestamp),
            latest: latest.and_then(decode_timestamp),
            device_count: devices as u64,
        })
    }
}
