//! Device snapshots as delivered by the hub client.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{Reading, ReadingType};

/// Up to four measurements taken by one device at one instant.
///
/// Snapshots are never stored. The ingest path splits them into
/// independent [`Reading`]s with [`DeviceSnapshot::readings`].
///
/// # Example
///
/// ```
/// use airhub_types::{DeviceSnapshot, ReadingType};
/// use time::OffsetDateTime;
///
/// let snapshot = DeviceSnapshot {
///     temperature: Some(21.5),
///     voc_index: Some(104.0),
///     ..DeviceSnapshot::new("d1", "Bedroom sensor", OffsetDateTime::UNIX_EPOCH)
/// };
///
/// let readings = snapshot.readings();
/// assert_eq!(readings.len(), 2);
/// assert_eq!(readings[1].reading_type, ReadingType::Voc);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub device_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub room_name: Option<String>,
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    #[cfg_attr(feature = "serde", serde(default))]
    pub temperature: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub humidity: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pm25: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub voc_index: Option<f64>,
}

impl DeviceSnapshot {
    /// Create a snapshot with no measurements.
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            room_name: None,
            timestamp,
            temperature: None,
            humidity: None,
            pm25: None,
            voc_index: None,
        }
    }

    /// The measurement for a given reading type, if present.
    #[must_use]
    pub fn value(&self, reading_type: ReadingType) -> Option<f64> {
        match reading_type {
            ReadingType::Temperature => self.temperature,
            ReadingType::Humidity => self.humidity,
            ReadingType::Pm25 => self.pm25,
            ReadingType::Voc => self.voc_index,
        }
    }

    /// Number of measurements present (0 to 4).
    #[must_use]
    pub fn measurement_count(&self) -> usize {
        ReadingType::ALL
            .iter()
            .filter(|t| self.value(**t).is_some())
            .count()
    }

    /// Decompose into one reading per present measurement.
    ///
    /// Readings come out in the order temperature, humidity, pm25, voc and
    /// all share the snapshot's device, room and timestamp.
    #[must_use]
    pub fn readings(&self) -> Vec<Reading> {
        ReadingType::ALL
            .iter()
            .filter_map(|&reading_type| {
                self.value(reading_type).map(|value| Reading {
                    device_id: self.device_id.clone(),
                    device_name: self.device_name.clone(),
                    room_name: self.room_name.clone(),
                    timestamp: self.timestamp,
                    reading_type,
                    value,
                })
            })
            .collect()
    }
}
