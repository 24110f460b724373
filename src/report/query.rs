//! Series selection for charting.
//!
//! Consumers pick one metric at one geography, a smoothing transform and an
//! optional date window. Smoothing runs over the full series first so the
//! window's leading days still get a complete week behind them; the result is
//! then sliced to the window. The snapshot itself is never modified.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{Metric, Series, Snapshot};
use crate::math::Transform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesQuery {
    pub metric: Metric,
    pub geo: String,
    pub transform: Transform,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SeriesQuery {
    pub fn new(metric: Metric, geo: impl Into<String>) -> Self {
        Self {
            metric,
            geo: geo.into(),
            transform: Transform::Identity,
            from: None,
            to: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesView {
    pub metric: Metric,
    pub geo: String,
    pub geo_name: String,
    pub transform: Transform,
    pub dates: Vec<NaiveDate>,
    pub values: Series,
}

impl SeriesView {
    /// Latest non-missing point.
    pub fn latest(&self) -> Option<(NaiveDate, i64)> {
        self.dates
            .iter()
            .zip(&self.values)
            .rev()
            .find_map(|(d, v)| v.map(|v| (*d, v)))
    }

    /// `(day index, value)` pairs for plotting, skipping missing points.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as f64, v as f64)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown geography '{geo}' for {metric}")]
    UnknownGeo { metric: Metric, geo: String },

    #[error("date range is inverted ({from} > {to})")]
    InvertedRange { from: NaiveDate, to: NaiveDate },
}

pub fn select(snapshot: &Snapshot, query: &SeriesQuery) -> Result<SeriesView, QueryError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(QueryError::InvertedRange { from, to });
        }
    }

    let raw = snapshot
        .series(query.metric, &query.geo)
        .ok_or_else(|| QueryError::UnknownGeo {
            metric: query.metric,
            geo: query.geo.clone(),
        })?;
    let smoothed = query.transform.apply(raw);

    let lo = query
        .from
        .map(|from| snapshot.dates.partition_point(|d| *d < from))
        .unwrap_or(0);
    let hi = query
        .to
        .map(|to| snapshot.dates.partition_point(|d| *d <= to))
        .unwrap_or(snapshot.dates.len());
    let hi = hi.max(lo);

    let geo_name = query
        .metric
        .hierarchy_kind()
        .hierarchy()
        .get(&query.geo)
        .map(|n| n.display_name.to_string())
        .unwrap_or_else(|| query.geo.clone());

    Ok(SeriesView {
        metric: query.metric,
        geo: query.geo.clone(),
        geo_name,
        transform: query.transform,
        dates: snapshot.dates[lo..hi].to_vec(),
        values: smoothed[lo..hi].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;
    use crate::domain::GeoSeries;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn snapshot() -> Snapshot {
        let dates: Vec<NaiveDate> = (1..=10).map(d).collect();
        let mut cases = GeoSeries::new();
        let mut values: Series = (1..=10).map(Some).collect();
        values[9] = None;
        cases.insert("BE".into(), values);
        let mut series = BTreeMap::new();
        series.insert(Metric::NewCases, cases);
        Snapshot::assemble(Utc::now(), dates, series)
    }

    #[test]
    fn full_range_identity() {
        let view = select(&snapshot(), &SeriesQuery::new(Metric::NewCases, "BE")).unwrap();
        assert_eq!(view.dates.len(), 10);
        assert_eq!(view.values[0], Some(1));
        assert_eq!(view.geo_name, "Belgium");
        assert_eq!(view.latest(), Some((d(9), 9)));
    }

    #[test]
    fn smoothing_happens_before_slicing() {
        let query = SeriesQuery {
            transform: Transform::Trailing,
            from: Some(d(7)),
            to: Some(d(8)),
            ..SeriesQuery::new(Metric::NewCases, "BE")
        };
        let view = select(&snapshot(), &query).unwrap();
        assert_eq!(view.dates, vec![d(7), d(8)]);
        // ceil(28/7), ceil(35/7): the window still sees days 1..=6.
        assert_eq!(view.values, vec![Some(4), Some(5)]);
    }

    #[test]
    fn open_ended_and_out_of_axis_bounds() {
        let snap = snapshot();
        let from_only = SeriesQuery {
            from: Some(d(9)),
            ..SeriesQuery::new(Metric::NewCases, "BE")
        };
        assert_eq!(select(&snap, &from_only).unwrap().dates, vec![d(9), d(10)]);

        let beyond = SeriesQuery {
            from: Some(NaiveDate::from_ymd_opt(2022, 1, 1).unwrap()),
            ..SeriesQuery::new(Metric::NewCases, "BE")
        };
        let view = select(&snap, &beyond).unwrap();
        assert!(view.dates.is_empty() && view.values.is_empty());
        assert_eq!(view.latest(), None);
    }

    #[test]
    fn unknown_geo_and_inverted_range_are_errors() {
        let snap = snapshot();
        let err = select(&snap, &SeriesQuery::new(Metric::NewCases, "XX")).unwrap_err();
        assert!(matches!(err, QueryError::UnknownGeo { .. }));

        let inverted = SeriesQuery {
            from: Some(d(5)),
            to: Some(d(2)),
            ..SeriesQuery::new(Metric::NewCases, "BE")
        };
        assert!(matches!(select(&snap, &inverted), Err(QueryError::InvertedRange { .. })));
    }

    #[test]
    fn points_skip_missing() {
        let view = select(&snapshot(), &SeriesQuery::new(Metric::NewCases, "BE")).unwrap();
        let pts = view.points();
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], (0.0, 1.0));
    }
}
