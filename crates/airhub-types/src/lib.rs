//! Reading and snapshot types for airhub indoor air sensors.
//!
//! This crate holds the data model shared by the store and its callers:
//! typed readings, the snapshots the hub client produces, and inclusive
//! time ranges.
//!
//! # Features
//!
//! - [`ReadingType`] with its fixed unit table
//! - [`Reading`], the atomic stored unit
//! - [`DeviceSnapshot`] and its decomposition into readings
//! - [`TimeRange`] with explicit ordering validation
//!
//! # Example
//!
//! ```
//! use airhub_types::{DeviceSnapshot, ReadingType};
//! use time::OffsetDateTime;
//!
//! let snapshot = DeviceSnapshot {
//!     pm25: Some(4.0),
//!     ..DeviceSnapshot::new("d1", "Office", OffsetDateTime::now_utc())
//! };
//! let readings = snapshot.readings();
//! assert_eq!(readings[0].unit(), ReadingType::Pm25.unit());
//! ```

pub mod error;
pub mod snapshot;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use snapshot::DeviceSnapshot;
pub use types::{Reading, ReadingType, TimeRange};

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::datetime;

    fn full_snapshot() -> DeviceSnapshot {
        DeviceSnapshot {
            room_name: Some("Living room".to_string()),
            temperature: Some(21.5),
            humidity: Some(43.0),
            pm25: Some(3.0),
            voc_index: Some(98.0),
            ..DeviceSnapshot::new("d1", "Vindstyrka", datetime!(2025-03-01 12:00:00 UTC))
        }
    }

    // --- ReadingType tests ---

    #[test]
    fn test_reading_type_units() {
        assert_eq!(ReadingType::Temperature.unit(), "°C");
        assert_eq!(ReadingType::Humidity.unit(), "%");
        assert_eq!(ReadingType::Pm25.unit(), "μg/m³");
        assert_eq!(ReadingType::Voc.unit(), "index");
    }

    #[test]
    fn test_reading_type_names_round_trip_through_from_str() {
        for reading_type in ReadingType::ALL {
            let parsed: ReadingType = reading_type.as_str().parse().unwrap();
            assert_eq!(parsed, reading_type);
        }
    }

    #[test]
    fn test_reading_type_from_str_aliases() {
        assert_eq!("PM2.5".parse::<ReadingType>(), Ok(ReadingType::Pm25));
        assert_eq!("vocIndex".parse::<ReadingType>(), Ok(ReadingType::Voc));
        assert_eq!(" Humidity ".parse::<ReadingType>(), Ok(ReadingType::Humidity));
    }

    #[test]
    fn test_reading_type_from_str_unknown() {
        let err = "co2".parse::<ReadingType>().unwrap_err();
        assert_eq!(err, ParseError::UnknownReadingType("co2".to_string()));
        assert_eq!(err.to_string(), "Unknown reading type: co2");
    }

    #[test]
    fn test_check_unit() {
        assert!(ReadingType::Humidity.check_unit("%").is_ok());
        let err = ReadingType::Humidity.check_unit("°C").unwrap_err();
        assert!(matches!(err, ParseError::UnitMismatch { .. }));
    }

    #[test]
    fn test_reading_type_display() {
        assert_eq!(format!("{}", ReadingType::Pm25), "pm25");
    }

    // --- Reading tests ---

    #[test]
    fn test_reading_unit_follows_type() {
        let reading = Reading::new("d1", "Office", datetime!(2025-01-01 0:00 UTC), ReadingType::Voc, 120.0);
        assert_eq!(reading.unit(), "index");
        assert!(reading.room_name.is_none());
    }

    #[test]
    fn test_reading_in_room() {
        let reading = Reading::new("d1", "Office", datetime!(2025-01-01 0:00 UTC), ReadingType::Humidity, 40.0)
            .in_room("Study");
        assert_eq!(reading.room_name.as_deref(), Some("Study"));
    }

    #[test]
    fn test_reading_validate() {
        let ts = datetime!(2025-01-01 0:00 UTC);
        assert!(Reading::new("d1", "x", ts, ReadingType::Pm25, 2.0).validate().is_ok());
        assert_eq!(
            Reading::new("  ", "x", ts, ReadingType::Pm25, 2.0).validate(),
            Err(ParseError::EmptyDeviceId)
        );
        assert!(matches!(
            Reading::new("d1", "x", ts, ReadingType::Pm25, f64::NAN).validate(),
            Err(ParseError::NonFiniteValue(_))
        ));
        assert!(matches!(
            Reading::new("d1", "x", ts, ReadingType::Pm25, f64::INFINITY).validate(),
            Err(ParseError::NonFiniteValue(_))
        ));
    }

    // --- DeviceSnapshot tests ---

    #[test]
    fn test_snapshot_full_decomposition() {
        let readings = full_snapshot().readings();
        let types: Vec<_> = readings.iter().map(|r| r.reading_type).collect();
        assert_eq!(types, ReadingType::ALL.to_vec());
        for reading in &readings {
            assert_eq!(reading.device_id, "d1");
            assert_eq!(reading.room_name.as_deref(), Some("Living room"));
            assert_eq!(reading.timestamp, datetime!(2025-03-01 12:00:00 UTC));
        }
        assert_eq!(readings[3].value, 98.0);
    }

    #[test]
    fn test_snapshot_empty_decomposition() {
        let snapshot = DeviceSnapshot::new("d1", "Empty", datetime!(2025-03-01 12:00:00 UTC));
        assert_eq!(snapshot.measurement_count(), 0);
        assert!(snapshot.readings().is_empty());
    }

    #[test]
    fn test_snapshot_value_lookup() {
        let snapshot = full_snapshot();
        assert_eq!(snapshot.value(ReadingType::Temperature), Some(21.5));
        assert_eq!(snapshot.value(ReadingType::Voc), Some(98.0));
        assert_eq!(snapshot.measurement_count(), 4);
    }

    // --- TimeRange tests ---

    #[test]
    fn test_time_range_new_rejects_inverted() {
        let start = datetime!(2025-01-02 0:00 UTC);
        let end = datetime!(2025-01-01 0:00 UTC);
        let err = TimeRange::new(start, end).unwrap_err();
        assert_eq!(err, ParseError::InvalidRange { start, end });
    }

    #[test]
    fn test_time_range_single_instant_is_valid() {
        let t = datetime!(2025-01-01 0:00 UTC);
        let range = TimeRange::new(t, t).unwrap();
        assert!(range.contains(t));
        assert_eq!(range.duration(), Duration::ZERO);
    }

    #[test]
    fn test_time_range_contains_is_inclusive() {
        let range = TimeRange::ending_at(datetime!(2025-01-31 0:00 UTC), Duration::days(30));
        assert_eq!(range.start, datetime!(2025-01-01 0:00 UTC));
        assert!(range.contains(range.start));
        assert!(range.contains(range.end));
        assert!(!range.contains(range.end + Duration::nanoseconds(1)));
    }

    // --- Serialization tests ---

    #[test]
    fn test_reading_serialization_includes_unit() {
        let reading = Reading::new("d1", "Office", datetime!(2025-01-01 8:30 UTC), ReadingType::Temperature, 20.5);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains("\"deviceId\":\"d1\""));
        assert!(json.contains("\"type\":\"temperature\""));
        assert!(json.contains("\"unit\":\"°C\""));
        assert!(json.contains("\"timestamp\":\"2025-01-01T08:30:00Z\""));
        assert!(!json.contains("roomName"));
    }

    #[test]
    fn test_reading_deserialization_rejects_wrong_unit() {
        let json = r#"{"deviceId":"d1","deviceName":"x","timestamp":"2025-01-01T00:00:00Z","type":"humidity","value":40.0,"unit":"°C"}"#;
        assert!(serde_json::from_str::<Reading>(json).is_err());
    }

    #[test]
    fn test_reading_deserialization_without_unit() {
        let json = r#"{"deviceId":"d1","deviceName":"x","roomName":"Hall","timestamp":"2025-01-01T00:00:00Z","type":"pm25","value":7.5}"#;
        let reading: Reading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.reading_type, ReadingType::Pm25);
        assert_eq!(reading.room_name.as_deref(), Some("Hall"));
        assert_eq!(reading.unit(), "μg/m³");
    }

    #[test]
    fn test_snapshot_deserialization_camel_case() {
        let json = r#"{
            "deviceId": "abc",
            "deviceName": "Bedroom",
            "roomName": "Bedroom",
            "timestamp": "2025-02-10T06:00:00+01:00",
            "temperature": 19.0,
            "vocIndex": 87
        }"#;
        let snapshot: DeviceSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.measurement_count(), 2);
        assert_eq!(snapshot.voc_index, Some(87.0));
        assert_eq!(snapshot.timestamp, datetime!(2025-02-10 05:00:00 UTC));
        assert!(snapshot.humidity.is_none());
    }
}
