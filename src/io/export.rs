//! Export snapshot series to CSV.
//!
//! Long format (`date,metric,geo,value`) so spreadsheets and downstream scripts
//! can pivot freely. Missing points are written as empty cells.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Metric, Snapshot};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct Row<'a> {
    date: String,
    metric: &'static str,
    geo: &'a str,
    value: Option<i64>,
}

/// Write every metric/geography series of a snapshot to a CSV file.
pub fn write_series_csv(path: &Path, snapshot: &Snapshot) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_series(file, snapshot)
}

/// Same as [`write_series_csv`], to any writer.
pub fn write_series<W: Write>(writer: W, snapshot: &Snapshot) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_writer(writer);

    for metric in Metric::ALL {
        for (geo, series) in snapshot.metric(metric) {
            for (date, value) in snapshot.dates.iter().zip(series) {
                wtr.serialize(Row {
                    date: date.to_string(),
                    metric: metric.key(),
                    geo,
                    value: *value,
                })
                .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
            }
        }
    }

    wtr.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
