//! CSV and JSON export and import of readings.
//!
//! Both formats carry the unit next to the value. Import is lenient per row:
//! a row that cannot be parsed or stored is counted in
//! [`ImportResult::failed`] with a message, and the remaining rows are still
//! imported.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

use airhub_types::Reading;

use crate::error::{Error, Result};
use crate::models::{CsvRow, ImportResult};
use crate::queries::ReadingQuery;
use crate::store::Store;

impl Store {
    /// Export the readings matching `query` as CSV with a header row.
    pub fn export_csv(&self, query: &ReadingQuery) -> Result<String> {
        let readings = self.query(query)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for reading in &readings {
            writer.serialize(to_csv_row(reading)?)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;

        info!("Exported {} reading(s) as CSV", readings.len());
        String::from_utf8(bytes).map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    /// Export the readings matching `query` as a pretty-printed JSON array.
    pub fn export_json(&self, query: &ReadingQuery) -> Result<String> {
        let readings = self.query(query)?;
        info!("Exported {} reading(s) as JSON", readings.len());
        Ok(serde_json::to_string_pretty(&readings)?)
    }

    /// Import readings from CSV in the layout written by [`Store::export_csv`].
    pub fn import_csv(&self, data: &str) -> Result<ImportResult> {
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let mut parsed = Vec::new();
        let mut result = ImportResult::default();

        for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row_number = i + 1;
            match row.map_err(Error::from).and_then(from_csv_row) {
                Ok(reading) => parsed.push((row_number, reading)),
                Err(e) => result.record_failure(row_number, &e),
            }
        }

        self.store_parsed(parsed, result)
    }

    /// Import readings from a JSON array in the layout written by
    /// [`Store::export_json`].
    ///
    /// Fails outright only when the input is not a JSON array.
    pub fn import_json(&self, data: &str) -> Result<ImportResult> {
        let values: Vec<serde_json::Value> = serde_json::from_str(data)?;
        let mut parsed = Vec::new();
        let mut result = ImportResult::default();

        for (i, value) in values.into_iter().enumerate() {
            let row_number = i + 1;
            match serde_json::from_value::<Reading>(value) {
                Ok(reading) => parsed.push((row_number, reading)),
                Err(e) => result.record_failure(row_number, &Error::from(e)),
            }
        }

        self.store_parsed(parsed, result)
    }

    fn store_parsed(
        &self,
        parsed: Vec<(usize, Reading)>,
        mut result: ImportResult,
    ) -> Result<ImportResult> {
        let (row_numbers, readings): (Vec<usize>, Vec<Reading>) = parsed.into_iter().unzip();
        let batch = self.put_batch(&readings)?;

        result.imported = batch.inserted_count();
        for failure in &batch.failed {
            result.record_failure(row_numbers[failure.index], &failure.error);
        }

        if result.failed > 0 {
            warn!("Import skipped {} row(s)", result.failed);
        }
        info!("Imported {} reading(s)", result.imported);
        Ok(result)
    }
}

impl ImportResult {
    fn record_failure(&mut self, row_number: usize, error: &Error) {
        self.failed += 1;
        self.errors.push(format!("row {}: {}", row_number, error));
    }
}

fn to_csv_row(reading: &Reading) -> Result<CsvRow> {
    let timestamp = reading
        .timestamp
        .format(&Rfc3339)
        .map_err(|e| Error::InvalidTimestamp(e.to_string()))?;

    Ok(CsvRow {
        device_id: reading.device_id.clone(),
        device_name: reading.device_name.clone(),
        room_name: reading.room_name.clone(),
        timestamp,
        reading_type: reading.reading_type,
        value: reading.value,
        unit: reading.unit().to_string(),
    })
}

fn from_csv_row(row: CsvRow) -> Result<Reading> {
    let timestamp = OffsetDateTime::parse(&row.timestamp, &Rfc3339)
        .map_err(|e| Error::InvalidTimestamp(format!("{}: {}", row.timestamp, e)))?;

    // An empty unit column means "the type's unit"
    if !row.unit.is_empty() {
        row.reading_type.check_unit(&row.unit)?;
    }

    Ok(Reading {
        device_id: row.device_id,
        device_name: row.device_name,
        room_name: row.room_name.filter(|room| !room.is_empty()),
        timestamp,
        reading_type: row.reading_type,
        value: row.value,
    })
}
