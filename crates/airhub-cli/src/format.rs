//! Output formatting for readings, devices and statistics.

use anyhow::Result;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use airhub_store::{DeviceSummary, Statistics, StoredReading};

use crate::cli::OutputFormat;

pub fn format_timestamp(timestamp: OffsetDateTime) -> Result<String> {
    Ok(timestamp.format(&Rfc3339)?)
}

/// Render readings in the requested format.
pub fn format_readings(readings: &[StoredReading], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(readings)? + "\n"),
        OutputFormat::Csv => format_readings_csv(readings),
        OutputFormat::Text => format_readings_text(readings),
    }
}

fn format_readings_text(readings: &[StoredReading]) -> Result<String> {
    if readings.is_empty() {
        return Ok("No readings found.\n".to_string());
    }

    let mut output = format!(
        "{:>8}  {:<25} {:<16} {:<12} {:>10} {}\n",
        "ID", "Timestamp", "Device", "Type", "Value", "Unit"
    );
    output.push_str(&"-".repeat(80));
    output.push('\n');

    for stored in readings {
        let reading = &stored.reading;
        output.push_str(&format!(
            "{:>8}  {:<25} {:<16} {:<12} {:>10.1} {}\n",
            stored.id,
            format_timestamp(reading.timestamp)?,
            reading.device_id,
            reading.reading_type,
            reading.value,
            reading.unit()
        ));
    }

    Ok(output)
}

fn format_readings_csv(readings: &[StoredReading]) -> Result<String> {
    let mut output = String::from("id,timestamp,device_id,device_name,room_name,type,value,unit\n");
    for stored in readings {
        let reading = &stored.reading;
        output.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            stored.id,
            format_timestamp(reading.timestamp)?,
            csv_escape(&reading.device_id),
            csv_escape(&reading.device_name),
            csv_escape(reading.room_name.as_deref().unwrap_or("")),
            reading.reading_type,
            reading.value,
            reading.unit()
        ));
    }
    Ok(output)
}

/// Quote a CSV field containing commas, quotes or line breaks.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render the device list in the requested format.
pub fn format_devices(devices: &[DeviceSummary], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(devices)? + "\n"),
        OutputFormat::Csv => {
            let mut output = String::from("device_id,device_name,room_name,reading_count,last_seen\n");
            for device in devices {
                output.push_str(&format!(
                    "{},{},{},{},{}\n",
                    csv_escape(&device.device_id),
                    csv_escape(&device.device_name),
                    csv_escape(device.room_name.as_deref().unwrap_or("")),
                    device.reading_count,
                    format_timestamp(device.last_seen)?
                ));
            }
            Ok(output)
        }
        OutputFormat::Text => {
            if devices.is_empty() {
                return Ok("No devices in store.\n".to_string());
            }
            let mut output = String::from("Stored devices:\n\n");
            for device in devices {
                let room = device.room_name.as_deref().unwrap_or("(no room)");
                output.push_str(&format!(
                    "  {} - {} [{}]\n    Readings:  {}\n    Last seen: {}\n\n",
                    device.device_id,
                    device.device_name,
                    room,
                    device.reading_count,
                    format_timestamp(device.last_seen)?
                ));
            }
            Ok(output)
        }
    }
}

/// Render statistics in the requested format.
pub fn format_statistics(stats: &Statistics, format: OutputFormat) -> Result<String> {
    let unit = stats.reading_type.unit();
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(stats)? + "\n"),
        OutputFormat::Csv => Ok(format!(
            "type,count,min,max,average,median,unit,start,end\n{},{},{},{},{},{},{},{},{}\n",
            stats.reading_type,
            stats.count,
            stats.min,
            stats.max,
            stats.average,
            stats.median,
            unit,
            format_timestamp(stats.time_range.start)?,
            format_timestamp(stats.time_range.end)?
        )),
        OutputFormat::Text => Ok(format!(
            "Statistics for {}:\n  Readings:   {}\n  Time range: {} to {}\n\n  {:>10} {:>10} {:>10} {:>10}\n  {}\n  {:>10.1} {:>10.1} {:>10.1} {:>10.1} {}\n",
            stats.reading_type,
            stats.count,
            format_timestamp(stats.time_range.start)?,
            format_timestamp(stats.time_range.end)?,
            "Min",
            "Max",
            "Avg",
            "Median",
            "-".repeat(44),
            stats.min,
            stats.max,
            stats.average,
            stats.median,
            unit
        )),
    }
}
