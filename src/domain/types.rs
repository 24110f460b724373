//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built once per refresh and shared read-only between threads
//! - served as JSON by the HTTP layer
//! - written to disk and reloaded later for viewing

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::geo::HierarchyKind;

/// One value per date on the axis; `None` marks a trimmed or missing point.
pub type Series = Vec<Option<i64>>;

/// Series for every node of one hierarchy, keyed by node code.
pub type GeoSeries = BTreeMap<String, Series>;

/// Metrics published in every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
#[value(rename_all = "camelCase")]
pub enum Metric {
    NewCases,
    NewHospital,
    InHospital,
    InIcu,
    Deaths,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::NewCases,
        Metric::NewHospital,
        Metric::InHospital,
        Metric::InIcu,
        Metric::Deaths,
    ];

    /// Key used in the published JSON and in query strings.
    pub fn key(self) -> &'static str {
        match self {
            Metric::NewCases => "newCases",
            Metric::NewHospital => "newHospital",
            Metric::InHospital => "inHospital",
            Metric::InIcu => "inIcu",
            Metric::Deaths => "deaths",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::NewCases => "New cases",
            Metric::NewHospital => "New hospitalisations",
            Metric::InHospital => "In hospital",
            Metric::InIcu => "In ICU",
            Metric::Deaths => "Deaths",
        }
    }

    pub fn hierarchy_kind(self) -> HierarchyKind {
        match self {
            Metric::Deaths => HierarchyKind::Region,
            _ => HierarchyKind::Province,
        }
    }

    pub fn from_key(key: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.key() == key)
    }

    pub fn next(self) -> Metric {
        let i = Metric::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Metric::ALL[(i + 1) % Metric::ALL.len()]
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Skip-last counts per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipLast {
    pub new_cases: usize,
    pub new_hospital: usize,
    pub in_hospital: usize,
    pub in_icu: usize,
    pub deaths: usize,
}

impl SkipLast {
    pub fn uniform(n: usize) -> Self {
        Self {
            new_cases: n,
            new_hospital: n,
            in_hospital: n,
            in_icu: n,
            deaths: n,
        }
    }

    pub fn get(&self, metric: Metric) -> usize {
        match metric {
            Metric::NewCases => self.new_cases,
            Metric::NewHospital => self.new_hospital,
            Metric::InHospital => self.in_hospital,
            Metric::InIcu => self.in_icu,
            Metric::Deaths => self.deaths,
        }
    }

    pub fn set(&mut self, metric: Metric, n: usize) {
        match metric {
            Metric::NewCases => self.new_cases = n,
            Metric::NewHospital => self.new_hospital = n,
            Metric::InHospital => self.in_hospital = n,
            Metric::InIcu => self.in_icu = n,
            Metric::Deaths => self.deaths = n,
        }
    }
}

impl Default for SkipLast {
    /// Case reports lag a few days behind; the other feeds settle after one.
    fn default() -> Self {
        Self {
            new_cases: 3,
            ..Self::uniform(1)
        }
    }
}

/// One complete, immutable aggregation result.
///
/// Every series in every map has exactly `dates.len()` entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub dates: Vec<NaiveDate>,
    pub new_cases: GeoSeries,
    pub new_hospital: GeoSeries,
    pub in_hospital: GeoSeries,
    pub in_icu: GeoSeries,
    pub deaths: GeoSeries,
}

impl Snapshot {
    /// Assemble a snapshot from per-metric series.
    ///
    /// Metrics missing from `series` are published as empty maps.
    pub fn assemble(
        timestamp: DateTime<Utc>,
        dates: Vec<NaiveDate>,
        mut series: BTreeMap<Metric, GeoSeries>,
    ) -> Self {
        let mut take = |m: Metric| series.remove(&m).unwrap_or_default();
        Self {
            timestamp,
            dates,
            new_cases: take(Metric::NewCases),
            new_hospital: take(Metric::NewHospital),
            in_hospital: take(Metric::InHospital),
            in_icu: take(Metric::InIcu),
            deaths: take(Metric::Deaths),
        }
    }

    pub fn metric(&self, metric: Metric) -> &GeoSeries {
        match metric {
            Metric::NewCases => &self.new_cases,
            Metric::NewHospital => &self.new_hospital,
            Metric::InHospital => &self.in_hospital,
            Metric::InIcu => &self.in_icu,
            Metric::Deaths => &self.deaths,
        }
    }

    pub fn series(&self, metric: Metric, geo: &str) -> Option<&Series> {
        self.metric(metric).get(geo)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Check the length invariant; returns the first offending `(metric, geo)`.
    pub fn misaligned(&self) -> Option<(Metric, &str)> {
        Metric::ALL.into_iter().find_map(|m| {
            self.metric(m)
                .iter()
                .find(|(_, s)| s.len() != self.dates.len())
                .map(|(geo, _)| (m, geo.as_str()))
        })
    }
}
