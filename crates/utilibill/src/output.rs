//! CSV sink for extracted records.

use crate::error::Result;
use crate::types::{FileRecord, EXTRACT_COLUMNS, FILENAME_COLUMN, MISSING};
use std::path::Path;

/// Write records to a CSV file with the fixed `[Filename] + fields` column
/// order. Missing values render as the literal placeholder, never blank.
///
/// An empty record set writes nothing at all - no file, not even headers -
/// and only logs a warning, so downstream consumers never see a header-only
/// artifact.
pub fn write_records_csv(path: impl AsRef<Path>, records: &[FileRecord]) -> Result<()> {
    let path = path.as_ref();
    if records.is_empty() {
        tracing::warn!("no records to write, skipping {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;

    let mut headers = vec![FILENAME_COLUMN];
    headers.extend(EXTRACT_COLUMNS);
    writer.write_record(&headers)?;

    for file_record in records {
        let mut row = vec![file_record.filename.as_str()];
        for value in file_record.record.values() {
            row.push(if value.trim().is_empty() { MISSING } else { value });
        }
        writer.write_record(&row)?;
    }

    writer.flush().map_err(crate::error::UtilibillError::Io)?;
    tracing::info!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}
