//! Ingest commands - store snapshots and single readings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use time::OffsetDateTime;

use airhub_store::{BatchResult, Store};
use airhub_types::{DeviceSnapshot, Reading, ReadingType};

use super::{parse_datetime, read_input};

/// Ingest input is either one snapshot or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotInput {
    Many(Vec<DeviceSnapshot>),
    One(DeviceSnapshot),
}

impl SnapshotInput {
    fn into_vec(self) -> Vec<DeviceSnapshot> {
        match self {
            SnapshotInput::Many(snapshots) => snapshots,
            SnapshotInput::One(snapshot) => vec![snapshot],
        }
    }
}

/// Parse snapshot JSON as produced by the hub client.
fn parse_snapshots(data: &str) -> Result<Vec<DeviceSnapshot>> {
    let input: SnapshotInput =
        serde_json::from_str(data).context("Input is not a snapshot or an array of snapshots")?;
    Ok(input.into_vec())
}

/// Execute the ingest command.
pub fn cmd_ingest(store: &Store, input: Option<&Path>) -> Result<()> {
    let snapshots = parse_snapshots(&read_input(input)?)?;

    let mut inserted = 0;
    let mut failed = 0;
    for snapshot in &snapshots {
        let result = store
            .ingest(snapshot)
            .with_context(|| format!("Failed to store snapshot from {}", snapshot.device_id))?;
        inserted += result.inserted_count();
        failed += result.failed.len();
        report_failures(&snapshot.device_id, &result);
    }

    println!(
        "Ingested {} snapshot(s): {} reading(s) stored, {} rejected",
        snapshots.len(),
        inserted,
        failed
    );
    Ok(())
}

fn report_failures(device_id: &str, result: &BatchResult) {
    for failure in &result.failed {
        eprintln!("  {} reading #{}: {}", device_id, failure.index, failure.error);
    }
}

/// Execute the put command.
pub fn cmd_put(
    store: &Store,
    device: &str,
    name: Option<&str>,
    room: Option<&str>,
    reading_type: ReadingType,
    value: f64,
    at: Option<&str>,
) -> Result<()> {
    let timestamp = match at {
        Some(at) => parse_datetime(at)?,
        None => OffsetDateTime::now_utc(),
    };

    let mut reading = Reading::new(device, name.unwrap_or(device), timestamp, reading_type, value);
    if let Some(room) = room {
        reading = reading.in_room(room);
    }

    let id = store.put(&reading).context("Failed to store reading")?;
    println!("Stored reading {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_snapshot() {
        let data = r#"{"deviceId": "d1", "deviceName": "Office",
                      "timestamp": "2025-05-01T10:00:00Z", "pm25": 4.5}"#;
        let snapshots = parse_snapshots(data).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].pm25, Some(4.5));
        assert_eq!(snapshots[0].readings().len(), 1);
    }

    #[test]
    fn test_parse_snapshot_array() {
        let data = r#"[
            {"deviceId": "d1", "deviceName": "A", "timestamp": "2025-05-01T10:00:00Z",
             "temperature": 21.0, "humidity": 40.0},
            {"deviceId": "d2", "deviceName": "B", "roomName": "Hall",
             "timestamp": "2025-05-01T10:00:00Z", "vocIndex": 100.0}
        ]"#;
        let snapshots = parse_snapshots(data).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].room_name.as_deref(), Some("Hall"));
        assert_eq!(snapshots[1].voc_index, Some(100.0));
    }

    #[test]
    fn test_parse_rejects_other_json() {
        assert!(parse_snapshots(r#"{"hello": "world"}"#).is_err());
    }
}
