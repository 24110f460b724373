//! Aggregation engine: raw feeds in, one aligned snapshot out.
//!
//! normalize -> date axis (once, all metrics) -> rollup (per metric) -> trim
//! (per metric, last). Nothing here does I/O; the orchestrator in `service`
//! owns fetching and publishing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::debug;

use crate::data::{FeedError, RawFeeds};
use crate::domain::{GeoSeries, Metric, SkipLast, Snapshot};

pub mod axis;
pub mod normalize;
pub mod rollup;
pub mod trim;

pub use axis::DateAxis;
pub use normalize::{FlatRecord, NormalizeStats, NormalizedFeeds, normalize};
pub use rollup::{RollupOverflow, rollup};
pub use trim::{trim, trim_all};

/// Snapshot plus the data-quality counters gathered while building it.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub snapshot: Snapshot,
    pub stats: NormalizeStats,
}

/// Build a complete snapshot from the three raw feeds.
///
/// Fails only when a rolled-up total leaves the `i64` range.
pub fn build_snapshot(
    feeds: &RawFeeds,
    skip_last: &SkipLast,
    timestamp: DateTime<Utc>,
) -> Result<Aggregation, FeedError> {
    let normalized = normalize(feeds);
    let axis = DateAxis::build(normalized.dates());

    let series: BTreeMap<Metric, GeoSeries> = Metric::ALL
        .par_iter()
        .map(|&metric| {
            let hierarchy = metric.hierarchy_kind().hierarchy();
            let rolled = rollup(normalized.records(metric), &axis, hierarchy)
                .map_err(|source| FeedError::Overflow { metric, source })?;
            Ok((metric, trim_all(rolled, skip_last.get(metric))))
        })
        .collect::<Result<_, FeedError>>()?;

    let stats = normalized.stats;
    if stats.missing_date + stats.invalid_date + stats.unmapped_geo > 0 {
        debug!(
            rows = stats.rows,
            missing_date = stats.missing_date,
            invalid_date = stats.invalid_date,
            unmapped_geo = stats.unmapped_geo,
            labels = ?stats.unmapped_labels,
            "normalization fallbacks"
        );
    }

    Ok(Aggregation {
        snapshot: Snapshot::assemble(timestamp, axis.into_dates(), series),
        stats,
    })
}
