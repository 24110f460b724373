//! Record normalization.
//!
//! Turns the three heterogeneous feed shapes into one flat
//! `(date, geo code, value)` stream per metric. Data-quality problems are
//! handled here and only counted:
//!
//! - no date, or a date that is not `YYYY-MM-DD`: the row is dropped
//! - no geography, or a label no leaf answers to: the row goes to `UNK`
//! - absent count fields: read as zero

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::data::{CasesRecord, DeathRecord, HospitalRecord, RawFeeds};
use crate::domain::{Hierarchy, Metric};

/// One normalized observation for a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRecord {
    pub date: NaiveDate,
    pub geo: &'static str,
    pub value: i64,
}

/// Counters for rows that needed a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub rows: usize,
    pub missing_date: usize,
    pub invalid_date: usize,
    pub unmapped_geo: usize,
    pub unmapped_labels: BTreeSet<String>,
}

/// Per-metric flat records plus the data-quality counters.
#[derive(Debug, Clone, Default)]
pub struct NormalizedFeeds {
    pub records: BTreeMap<Metric, Vec<FlatRecord>>,
    pub stats: NormalizeStats,
}

impl NormalizedFeeds {
    pub fn records(&self, metric: Metric) -> &[FlatRecord] {
        self.records.get(&metric).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every observed date, across all metrics (with repeats).
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.records.values().flatten().map(|r| r.date)
    }
}

type ValueField<R> = (Metric, fn(&R) -> Option<i64>);

/// Normalize all three feeds.
pub fn normalize(feeds: &RawFeeds) -> NormalizedFeeds {
    let mut out = NormalizedFeeds::default();
    for metric in Metric::ALL {
        out.records.insert(metric, Vec::new());
    }

    let cases_fields: [ValueField<CasesRecord>; 1] = [(Metric::NewCases, |r| r.cases)];
    normalize_rows(
        &feeds.cases,
        |r| (r.date.as_deref(), r.province.as_deref()),
        &cases_fields,
        &mut out,
    );

    let hospital_fields: [ValueField<HospitalRecord>; 3] = [
        (Metric::NewHospital, |r| r.new_in),
        (Metric::InHospital, |r| r.total_in),
        (Metric::InIcu, |r| r.total_in_icu),
    ];
    normalize_rows(
        &feeds.hospital,
        |r| (r.date.as_deref(), r.province.as_deref()),
        &hospital_fields,
        &mut out,
    );

    let death_fields: [ValueField<DeathRecord>; 1] = [(Metric::Deaths, |r| r.deaths)];
    normalize_rows(
        &feeds.deaths,
        |r| (r.date.as_deref(), r.region.as_deref()),
        &death_fields,
        &mut out,
    );

    out
}

fn normalize_rows<R>(
    rows: &[R],
    keys: impl Fn(&R) -> (Option<&str>, Option<&str>),
    fields: &[ValueField<R>],
    out: &mut NormalizedFeeds,
) {
    // All metrics of one feed share a hierarchy.
    let Some(&(first, _)) = fields.first() else {
        return;
    };
    let hierarchy: &Hierarchy = first.hierarchy_kind().hierarchy();

    for row in rows {
        out.stats.rows += 1;
        let (date, label) = keys(row);

        let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) else {
            out.stats.missing_date += 1;
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
            out.stats.invalid_date += 1;
            continue;
        };

        let (geo, known) = hierarchy.resolve(label);
        if !known {
            out.stats.unmapped_geo += 1;
            if let Some(label) = label {
                out.stats.unmapped_labels.insert(label.to_string());
            }
        }

        for (metric, value) in fields {
            out.records.entry(*metric).or_default().push(FlatRecord {
                date,
                geo,
                value: value(row).unwrap_or(0),
            });
        }
    }
}
