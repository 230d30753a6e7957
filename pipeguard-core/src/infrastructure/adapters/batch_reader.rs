// pipeguard-core/src/infrastructure/adapters/batch_reader.rs

// Local file readers turning a landed extract into a `Batch`.

use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, instrument};

use crate::domain::batch::{Batch, Record, Value};
use crate::error::PipeguardError;
use crate::infrastructure::error::InfrastructureError;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["csv", "json"];

/// Reads a CSV or JSON file, picking the reader from the file extension.
#[instrument(skip(path, schema), fields(path = %path.display()))]
pub fn load_batch(path: &Path, name: &str, schema: &[String]) -> Result<Batch, PipeguardError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let batch = match extension.as_str() {
        "csv" => {
            let file = fs::File::open(path).map_err(|source| InfrastructureError::ReadFile {
                path: path.display().to_string(),
                source,
            })?;
            read_csv(file, name, schema)?
        }
        "json" => {
            let content =
                fs::read_to_string(path).map_err(|source| InfrastructureError::ReadFile {
                    path: path.display().to_string(),
                    source,
                })?;
            read_json(&content, name, schema)?
        }
        _ => {
            return Err(InfrastructureError::UnsupportedSource(format!(
                "{} (expected one of {:?})",
                path.display(),
                SUPPORTED_EXTENSIONS
            ))
            .into());
        }
    };

    debug!(records = batch.len(), "Batch loaded");
    Ok(batch)
}

/// Every cell stays text; rules coerce numbers and dates themselves.
/// Empty cells become nulls.
pub fn read_csv<R: Read>(
    reader: R,
    name: &str,
    schema: &[String],
) -> Result<Batch, InfrastructureError> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::from(cell)
                };
                (column.to_string(), value)
            })
            .collect();
        records.push(record);
    }

    Ok(Batch::new(name, schema.to_vec(), records))
}

pub fn read_json(content: &str, name: &str, schema: &[String]) -> Result<Batch, PipeguardError> {
    let doc: serde_json::Value =
        serde_json::from_str(content).map_err(InfrastructureError::Json)?;
    Ok(Batch::from_json(name, schema.to_vec(), &doc)?)
}
