//! Core types for stored sensor readings.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::{ParseError, ParseResult};

/// Kind of quantity a [`Reading`] measures.
///
/// Each kind has exactly one unit, so a reading's unit is always derived
/// from its type and never stored independently.
///
/// ```
/// use airhub_types::ReadingType;
///
/// assert_eq!(ReadingType::Pm25.unit(), "μg/m³");
/// assert_eq!("vocIndex".parse::<ReadingType>(), Ok(ReadingType::Voc));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ReadingType {
    /// Air temperature in degrees Celsius.
    Temperature,
    /// Relative humidity percentage.
    Humidity,
    /// PM2.5 particulate matter concentration.
    Pm25,
    /// Volatile organic compound index (dimensionless).
    Voc,
}

impl ReadingType {
    /// All reading types, in snapshot decomposition order.
    pub const ALL: [ReadingType; 4] = [
        ReadingType::Temperature,
        ReadingType::Humidity,
        ReadingType::Pm25,
        ReadingType::Voc,
    ];

    /// The fixed unit for this reading type.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        match self {
            ReadingType::Temperature => "°C",
            ReadingType::Humidity => "%",
            ReadingType::Pm25 => "μg/m³",
            ReadingType::Voc => "index",
        }
    }

    /// Stable lowercase name, as persisted in the `type` column.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingType::Temperature => "temperature",
            ReadingType::Humidity => "humidity",
            ReadingType::Pm25 => "pm25",
            ReadingType::Voc => "voc",
        }
    }

    /// Check that `unit` is the unit of this reading type.
    pub fn check_unit(&self, unit: &str) -> ParseResult<()> {
        if unit == self.unit() {
            Ok(())
        } else {
            Err(ParseError::UnitMismatch {
                reading_type: *self,
                unit: unit.to_string(),
            })
        }
    }
}

impl FromStr for ReadingType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(ReadingType::Temperature),
            "humidity" => Ok(ReadingType::Humidity),
            "pm25" | "pm2.5" | "pm2_5" => Ok(ReadingType::Pm25),
            "voc" | "vocindex" | "voc_index" => Ok(ReadingType::Voc),
            _ => Err(ParseError::UnknownReadingType(s.to_string())),
        }
    }
}

impl fmt::Display for ReadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One measured value of one type from one device at one instant.
///
/// Readings are immutable facts: the store inserts and deletes them but
/// never updates one in place.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(into = "ReadingRecord", try_from = "ReadingRecord")
)]
pub struct Reading {
    /// Stable device identifier.
    pub device_id: String,
    /// Display label of the device (not unique).
    pub device_name: String,
    /// Room the device is assigned to, if any.
    pub room_name: Option<String>,
    /// When the value was measured.
    pub timestamp: OffsetDateTime,
    /// What the value measures.
    pub reading_type: ReadingType,
    /// Measured value, interpreted according to `reading_type`.
    pub value: f64,
}

impl Reading {
    /// Create a reading without a room assignment.
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        timestamp: OffsetDateTime,
        reading_type: ReadingType,
        value: f64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            room_name: None,
            timestamp,
            reading_type,
            value,
        }
    }

    /// Assign the reading to a room.
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room_name = Some(room.into());
        self
    }

    /// Unit of the value, derived from the reading type.
    #[must_use]
    pub fn unit(&self) -> &'static str {
        self.reading_type.unit()
    }

    /// Check that the reading can be stored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::EmptyDeviceId`] for a blank device id and
    /// [`ParseError::NonFiniteValue`] for NaN or infinite values.
    pub fn validate(&self) -> ParseResult<()> {
        if self.device_id.trim().is_empty() {
            return Err(ParseError::EmptyDeviceId);
        }
        if !self.value.is_finite() {
            return Err(ParseError::NonFiniteValue(self.value));
        }
        Ok(())
    }
}

/// Serialized shape of a [`Reading`], carrying the unit explicitly.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadingRecord {
    device_id: String,
    device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    room_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    reading_type: ReadingType,
    value: f64,
    #[serde(default)]
    unit: Option<String>,
}

#[cfg(feature = "serde")]
impl From<Reading> for ReadingRecord {
    fn from(reading: Reading) -> Self {
        let unit = Some(reading.unit().to_string());
        Self {
            device_id: reading.device_id,
            device_name: reading.device_name,
            room_name: reading.room_name,
            timestamp: reading.timestamp,
            reading_type: reading.reading_type,
            value: reading.value,
            unit,
        }
    }
}

#[cfg(feature = "serde")]
impl TryFrom<ReadingRecord> for Reading {
    type Error = ParseError;

    fn try_from(record: ReadingRecord) -> Result<Self, Self::Error> {
        if let Some(unit) = &record.unit {
            record.reading_type.check_unit(unit)?;
        }
        Ok(Reading {
            device_id: record.device_id,
            device_name: record.device_name,
            room_name: record.room_name,
            timestamp: record.timestamp,
            reading_type: record.reading_type,
            value: record.value,
        })
    }
}

/// Inclusive time interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeRange {
    /// First instant included in the range.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub start: OffsetDateTime,
    /// Last instant included in the range.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub end: OffsetDateTime,
}

impl TimeRange {
    /// Create a range, rejecting a start that lies after the end.
    ///
    /// ```
    /// use airhub_types::TimeRange;
    /// use time::macros::datetime;
    ///
    /// assert!(TimeRange::new(datetime!(2025-01-02 0:00 UTC), datetime!(2025-01-01 0:00 UTC)).is_err());
    /// ```
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> ParseResult<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    /// Range covering `duration` up to and including `end`.
    pub fn ending_at(end: OffsetDateTime, duration: Duration) -> Self {
        Self {
            start: end - duration.abs(),
            end,
        }
    }

    /// Check the `start <= end` invariant.
    ///
    /// Ranges built with struct literal syntax skip [`TimeRange::new`], so
    /// consumers call this before using one.
    pub fn validate(&self) -> ParseResult<()> {
        if self.start > self.end {
            Err(ParseError::InvalidRange {
                start: self.start,
                end: self.end,
            })
        } else {
            Ok(())
        }
    }

    /// Whether `instant` lies within the range (both ends inclusive).
    #[must_use]
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Length of the range.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
