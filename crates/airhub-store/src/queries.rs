//! Query builder and index selection.
//!
//! [`ReadingQuery`] describes which readings to return. Before running it,
//! the store picks the most selective index for the filters present (see
//! [`AccessPath`]) and pins it with SQLite's `INDEXED BY` clause, so the
//! access path is a property of the query rather than a planner decision.
//!
//! Results are always ordered newest first. Readings that share a timestamp
//! keep their insertion order, which makes `limit`/`offset` pagination
//! stable across pages.
//!
//! # Example
//!
//! ```
//! use airhub_store::{AccessPath, ReadingQuery};
//! use airhub_types::ReadingType;
//! use time::{Duration, OffsetDateTime};
//!
//! let now = OffsetDateTime::now_utc();
//! let query = ReadingQuery::new()
//!     .device("d1")
//!     .reading_type(ReadingType::Pm25)
//!     .range(now - Duration::days(1), now)
//!     .limit(50);
//!
//! assert_eq!(query.access_path(), AccessPath::DeviceTime);
//! ```

use std::fmt;

use airhub_types::{ReadingType, TimeRange};
use time::{Date, OffsetDateTime};

use crate::error::{Error, Result};
use crate::schema;

/// Columns selected for every reading query, in decoding order.
pub(crate) const READING_COLUMNS: &str =
    "id, device_id, device_name, room_name, timestamp, type, value, unit";

/// Index used to find candidate rows for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// Bounded scan of the `(device_id, timestamp)` composite index.
    DeviceTime,
    /// Equality lookup on the `device_id` index.
    Device,
    /// Range scan of the `timestamp` index.
    Timestamp,
    /// Membership lookup on the `type` index.
    Type,
    /// Scan of the whole table.
    FullScan,
}

impl AccessPath {
    /// The `FROM` clause suffix that pins this access path.
    pub(crate) fn index_clause(&self) -> String {
        match self {
            AccessPath::DeviceTime => format!("INDEXED BY {}", schema::IDX_DEVICE_TIME),
            AccessPath::Device => format!("INDEXED BY {}", schema::IDX_DEVICE),
            AccessPath::Timestamp => format!("INDEXED BY {}", schema::IDX_TIMESTAMP),
            AccessPath::Type => format!("INDEXED BY {}", schema::IDX_TYPE),
            AccessPath::FullScan => "NOT INDEXED".to_string(),
        }
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessPath::DeviceTime => "device+time",
            AccessPath::Device => "device",
            AccessPath::Timestamp => "time",
            AccessPath::Type => "type",
            AccessPath::FullScan => "full scan",
        };
        f.write_str(name)
    }
}

/// Fluent query builder for stored readings.
///
/// Use this to construct queries for [`Store::query`](crate::Store::query).
/// All filter methods are optional and can be chained in any order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReadingQuery {
    /// Filter by device ID.
    pub device_id: Option<String>,
    /// Filter by exact room name.
    pub room_name: Option<String>,
    /// Keep only these reading types. Empty means every type.
    pub types: Vec<ReadingType>,
    /// Inclusive time range.
    pub range: Option<TimeRange>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Number of results to skip.
    pub offset: Option<u32>,
}

impl ReadingQuery {
    /// Create a query matching every reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by device ID.
    pub fn device(mut self, device_id: &str) -> Self {
        self.device_id = Some(device_id.to_string());
        self
    }

    /// Filter by room name (exact match).
    pub fn room(mut self, room_name: &str) -> Self {
        self.room_name = Some(room_name.to_string());
        self
    }

    /// Add a reading type to the type filter.
    pub fn reading_type(mut self, reading_type: ReadingType) -> Self {
        if !self.types.contains(&reading_type) {
            self.types.push(reading_type);
        }
        self
    }

    /// Add several reading types to the type filter.
    pub fn types<I: IntoIterator<Item = ReadingType>>(self, types: I) -> Self {
        types.into_iter().fold(self, Self::reading_type)
    }

    /// Restrict to readings with `start <= timestamp <= end`.
    ///
    /// The bounds are checked when the query runs; an inverted range fails
    /// with [`Error::InvalidRange`] instead of being swapped.
    pub fn range(mut self, start: OffsetDateTime, end: OffsetDateTime) -> Self {
        self.range = Some(TimeRange { start, end });
        self
    }

    /// Restrict to readings at or after `start`, keeping any upper bound.
    pub fn since(self, start: OffsetDateTime) -> Self {
        let end = self
            .range
            .map_or_else(|| Date::MAX.midnight().assume_utc(), |r| r.end);
        self.range(start, end)
    }

    /// Restrict to readings at or before `end`, keeping any lower bound.
    pub fn until(self, end: OffsetDateTime) -> Self {
        let start = self
            .range
            .map_or_else(|| Date::MIN.midnight().assume_utc(), |r| r.start);
        self.range(start, end)
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    ///
    /// Use with `limit()` for pagination. For example, to get page 2
    /// with 50 items per page: `.limit(50).offset(50)`.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Check the query before it touches the store.
    pub fn validate(&self) -> Result<()> {
        if let Some(range) = &self.range
            && range.start > range.end
        {
            return Err(Error::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        Ok(())
    }

    /// Pick the index the query will scan.
    ///
    /// Priority: device with time range, device alone, time range alone,
    /// type filter alone, and finally a full scan.
    pub fn access_path(&self) -> AccessPath {
        match (&self.device_id, &self.range) {
            (Some(_), Some(_)) => AccessPath::DeviceTime,
            (Some(_), None) => AccessPath::Device,
            (None, Some(_)) => AccessPath::Timestamp,
            (None, None) if !self.types.is_empty() => AccessPath::Type,
            (None, None) => AccessPath::FullScan,
        }
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref device_id) = self.device_id {
            conditions.push("device_id = ?".to_string());
            params.push(Box::new(device_id.clone()));
        }

        if let Some(range) = self.range {
            conditions.push("timestamp >= ?".to_string());
            params.push(Box::new(encode_bound(range.start)));
            conditions.push("timestamp <= ?".to_string());
            params.push(Box::new(encode_bound(range.end)));
        }

        if !self.types.is_empty() {
            let placeholders = vec!["?"; self.types.len()].join(", ");
            conditions.push(format!("type IN ({})", placeholders));
            for reading_type in &self.types {
                params.push(Box::new(reading_type.as_str()));
            }
        }

        if let Some(ref room_name) = self.room_name {
            conditions.push("room_name = ?".to_string());
            params.push(Box::new(room_name.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();

        let mut sql = format!(
            "SELECT {} FROM readings {} {} ORDER BY timestamp DESC, id ASC",
            READING_COLUMNS,
            self.access_path().index_clause(),
            where_clause
        );

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset))
            }
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite only accepts OFFSET after a LIMIT; -1 means no limit
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        sql
    }
}

/// Encode a timestamp as stored: unix nanoseconds.
pub(crate) fn encode_timestamp(timestamp: OffsetDateTime) -> Result<i64> {
    i64::try_from(timestamp.unix_timestamp_nanos())
        .map_err(|_| Error::InvalidTimestamp(format!("{} is outside the storable range", timestamp)))
}

/// Encode a query bound, saturating instants outside the storable range.
pub(crate) fn encode_bound(timestamp: OffsetDateTime) -> i64 {
    let nanos = timestamp.unix_timestamp_nanos();
    if nanos > i128::from(i64::MAX) {
        i64::MAX
    } else if nanos < i128::from(i64::MIN) {
        i64::MIN
    } else {
        nanos as i64
    }
}

/// Decode a stored timestamp.
pub(crate) fn decode_timestamp(nanos: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::datetime;

    #[test]
    fn test_reading_query_new_defaults() {
        let query = ReadingQuery::new();
        assert!(query.device_id.is_none());
        assert!(query.room_name.is_none());
        assert!(query.types.is_empty());
        assert!(query.range.is_none());
        assert!(query.limit.is_none());
        assert!(query.offset.is_none());
    }

    #[test]
    fn test_reading_query_chaining() {
        let start = datetime!(2025-01-01 00:00:00 UTC);
        let end = datetime!(2025-01-31 23:59:59 UTC);

        let query = ReadingQuery::new()
            .device("d1")
            .room("Kitchen")
            .types([ReadingType::Pm25, ReadingType::Voc])
            .range(start, end)
            .limit(10)
            .offset(5);

        assert_eq!(query.device_id.as_deref(), Some("d1"));
        assert_eq!(query.room_name.as_deref(), Some("Kitchen"));
        assert_eq!(query.types, vec![ReadingType::Pm25, ReadingType::Voc]);
        assert_eq!(query.range, Some(TimeRange { start, end }));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn test_reading_type_filter_deduplicates() {
        let query = ReadingQuery::new()
            .reading_type(ReadingType::Humidity)
            .types([ReadingType::Humidity, ReadingType::Temperature]);
        assert_eq!(query.types, vec![ReadingType::Humidity, ReadingType::Temperature]);
    }

    #[test]
    fn test_since_extends_to_far_future() {
        let start = datetime!(2025-06-01 00:00:00 UTC);
        let query = ReadingQuery::new().since(start);
        let range = query.range.unwrap();
        assert_eq!(range.start, start);
        assert!(range.end > datetime!(9999-01-01 00:00:00 UTC));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_since_and_until_combine() {
        let start = datetime!(2025-06-01 00:00:00 UTC);
        let end = datetime!(2025-06-02 00:00:00 UTC);

        let query = ReadingQuery::new().until(end).since(start);
        assert_eq!(query.range, Some(TimeRange { start, end }));

        let query = ReadingQuery::new().until(end);
        assert!(query.range.unwrap().start < datetime!(0001-01-01 00:00:00 UTC));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let start = datetime!(2025-02-01 00:00:00 UTC);
        let end = datetime!(2025-01-01 00:00:00 UTC);
        let query = ReadingQuery::new().range(start, end);
        assert!(matches!(
            query.validate(),
            Err(Error::InvalidRange { start: s, end: e }) if s == start && e == end
        ));
    }

    // ==================== Index selection ====================

    #[test]
    fn test_access_path_priority() {
        let now = datetime!(2025-03-01 00:00:00 UTC);
        let day_ago = now - Duration::days(1);

        let both = ReadingQuery::new().device("d1").range(day_ago, now);
        assert_eq!(both.access_path(), AccessPath::DeviceTime);

        let device = ReadingQuery::new().device("d1").reading_type(ReadingType::Voc);
        assert_eq!(device.access_path(), AccessPath::Device);

        let time = ReadingQuery::new().range(day_ago, now).reading_type(ReadingType::Voc);
        assert_eq!(time.access_path(), AccessPath::Timestamp);

        let types = ReadingQuery::new().reading_type(ReadingType::Voc).room("Hall");
        assert_eq!(types.access_path(), AccessPath::Type);

        let room_only = ReadingQuery::new().room("Hall");
        assert_eq!(room_only.access_path(), AccessPath::FullScan);
        assert_eq!(ReadingQuery::new().access_path(), AccessPath::FullScan);
    }

    #[test]
    fn test_build_sql_pins_index() {
        let now = datetime!(2025-03-01 00:00:00 UTC);
        let sql = ReadingQuery::new().device("d1").range(now, now).build_sql();
        assert!(sql.contains("INDEXED BY idx_readings_device_time"));

        let sql = ReadingQuery::new().build_sql();
        assert!(sql.contains("NOT INDEXED"));
    }

    // ==================== SQL generation ====================

    #[test]
    fn test_build_where_empty() {
        let (where_clause, params) = ReadingQuery::new().build_where();
        assert_eq!(where_clause, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_where_filter_order() {
        let now = datetime!(2025-03-01 00:00:00 UTC);
        let query = ReadingQuery::new()
            .room("Hall")
            .types([ReadingType::Temperature, ReadingType::Humidity])
            .range(now - Duration::hours(1), now)
            .device("d1");
        let (where_clause, params) = query.build_where();

        assert_eq!(
            where_clause,
            "WHERE device_id = ? AND timestamp >= ? AND timestamp <= ? \
             AND type IN (?, ?) AND room_name = ?"
        );
        assert_eq!(params.len(), 6);
    }

    #[test]
    fn test_build_sql_orders_newest_first_with_stable_ties() {
        let sql = ReadingQuery::new().build_sql();
        assert!(sql.contains("ORDER BY timestamp DESC, id ASC"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_build_sql_pagination() {
        assert!(ReadingQuery::new().limit(50).build_sql().ends_with("LIMIT 50"));
        assert!(
            ReadingQuery::new()
                .limit(50)
                .offset(100)
                .build_sql()
                .ends_with("LIMIT 50 OFFSET 100")
        );
        assert!(
            ReadingQuery::new()
                .offset(25)
                .build_sql()
                .ends_with("LIMIT -1 OFFSET 25")
        );
    }

    #[test]
    fn test_build_sql_selects_all_columns() {
        let sql = ReadingQuery::new().build_sql();
        for column in ["device_id", "device_name", "room_name", "timestamp", "type", "value", "unit"] {
            assert!(sql.contains(column), "missing column {}", column);
        }
    }

    // ==================== Timestamp encoding ====================

    #[test]
    fn test_timestamp_encoding_round_trip_keeps_nanoseconds() {
        let ts = datetime!(2025-03-01 12:34:56.123456789 UTC);
        let encoded = encode_timestamp(ts).unwrap();
        assert_eq!(decode_timestamp(encoded), Some(ts));
    }

    #[test]
    fn test_timestamp_encoding_rejects_far_future() {
        let ts = datetime!(2300-01-01 00:00:00 UTC);
        assert!(matches!(encode_timestamp(ts), Err(Error::InvalidTimestamp(_))));
        assert_eq!(encode_bound(ts), i64::MAX);
        assert_eq!(encode_bound(datetime!(1500-01-01 00:00:00 UTC)), i64::MIN);
    }
}
