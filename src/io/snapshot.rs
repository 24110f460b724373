//! Read/write snapshot JSON files.
//!
//! The file format is exactly what `GET /data` serves, so a saved response can
//! be fed back into `epi view --snapshot`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::domain::Snapshot;
use crate::error::AppError;

/// Write a snapshot JSON file.
pub fn write_snapshot_json(path: &Path, snapshot: &Snapshot) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create snapshot JSON '{}': {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)
        .map_err(|e| AppError::new(2, format!("Failed to write snapshot JSON: {e}")))?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush snapshot JSON: {e}")))?;
    Ok(())
}

/// Read a snapshot JSON file and check its series are aligned with its dates.
pub fn read_snapshot_json(path: &Path) -> Result<Snapshot, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open snapshot JSON '{}': {e}", path.display())))?;
    let snapshot: Snapshot = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid snapshot JSON: {e}")))?;

    if let Some((metric, geo)) = snapshot.misaligned() {
        return Err(AppError::new(
            2,
            format!("Snapshot series {metric}/{geo} does not match the date axis length."),
        ));
    }
    Ok(snapshot)
}
