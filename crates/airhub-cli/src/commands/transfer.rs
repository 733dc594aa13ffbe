//! Export and import commands.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use airhub_store::Store;

use crate::cli::{ExportFormat, FilterArgs};

use super::{build_query, read_input};

/// Maximum import errors printed before summarizing the rest.
const MAX_REPORTED_ERRORS: usize = 10;

/// Execute the export command.
pub fn cmd_export(
    store: &Store,
    filter: &FilterArgs,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let query = build_query(filter)?;
    let content = match format {
        ExportFormat::Csv => store.export_csv(&query)?,
        ExportFormat::Json => store.export_json(&query)?,
    };

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create file: {}", path.display()))?;
            file.write_all(content.as_bytes())?;
            eprintln!("Exported to {}", path.display());
        }
        None => {
            print!("{}", content);
        }
    }

    Ok(())
}

/// Execute the import command.
pub fn cmd_import(store: &Store, format: ExportFormat, input: Option<&Path>) -> Result<()> {
    let data = read_input(input)?;

    let result = match format {
        ExportFormat::Csv => store.import_csv(&data)?,
        ExportFormat::Json => store.import_json(&data)?,
    };

    println!("Import complete:");
    println!("  Imported: {}", result.imported);
    println!("  Failed:   {}", result.failed);

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for err in result.errors.iter().take(MAX_REPORTED_ERRORS) {
            println!("  {}", err);
        }
        if result.errors.len() > MAX_REPORTED_ERRORS {
            println!(
                "  ... and {} more errors",
                result.errors.len() - MAX_REPORTED_ERRORS
            );
        }
    }

    Ok(())
}
