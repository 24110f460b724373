//! Skip-last trimming.
//!
//! The newest days of every feed are still being back-filled upstream, so they
//! are published as missing rather than as (too low) counts. Series keep their
//! length so they stay aligned with the date axis.

use crate::domain::{GeoSeries, Series};

/// Mark the last `skip_last` points of `series` missing.
pub fn trim(mut series: Series, skip_last: usize) -> Series {
    let keep = series.len().saturating_sub(skip_last);
    for v in &mut series[keep..] {
        *v = None;
    }
    series
}

/// Trim every geography of one metric identically.
pub fn trim_all(series: GeoSeries, skip_last: usize) -> GeoSeries {
    if skip_last == 0 {
        return series;
    }
    series
        .into_iter()
        .map(|(geo, s)| (geo, trim(s, skip_last)))
        .collect()
}
