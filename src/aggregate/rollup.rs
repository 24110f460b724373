//! Hierarchical rollup.
//!
//! Every node's value on a date is the sum of the records observed directly at
//! that node plus the values of its direct children. Records only ever resolve
//! to one node, so direct and child-derived contributions are disjoint and
//! nothing is counted twice.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::trace;

use crate::aggregate::axis::DateAxis;
use crate::aggregate::normalize::FlatRecord;
use crate::domain::{GeoSeries, Hierarchy};

/// A node total left the `i64` range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("total for {geo} on {date} overflows")]
pub struct RollupOverflow {
    pub geo: &'static str,
    pub date: NaiveDate,
}

/// Sum `records` over `hierarchy` on the shared `axis`.
///
/// The result has an entry for every node of the hierarchy, each exactly
/// `axis.len()` long. Dates without records are `Some(0)`. Records whose code
/// is not a node of the hierarchy, or whose date is not on the axis, are
/// skipped; the normalizer never produces either.
pub fn rollup(
    records: &[FlatRecord],
    axis: &DateAxis,
    hierarchy: &Hierarchy,
) -> Result<GeoSeries, RollupOverflow> {
    let width = axis.len();
    let mut totals: Vec<Vec<i64>> = vec![vec![0; width]; hierarchy.len()];
    let overflow = |node: usize, day: usize| RollupOverflow {
        geo: hierarchy.nodes()[node].code,
        date: axis.dates()[day],
    };

    let mut skipped = 0usize;
    for record in records {
        match (hierarchy.position(record.geo), axis.position(record.date)) {
            (Some(node), Some(day)) => {
                let cell = &mut totals[node][day];
                *cell = cell.checked_add(record.value).ok_or_else(|| overflow(node, day))?;
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        trace!(hierarchy = hierarchy.name(), skipped, "records outside hierarchy or axis");
    }

    // Children precede parents, so each child total is final when added.
    for &node in hierarchy.bottom_up() {
        for &child in hierarchy.children_of(node) {
            let (child_row, node_row) = pick_two(&mut totals, child, node);
            for (day, (acc, v)) in node_row.iter_mut().zip(child_row.iter()).enumerate() {
                *acc = acc.checked_add(*v).ok_or_else(|| overflow(node, day))?;
            }
        }
    }

    Ok(hierarchy
        .nodes()
        .iter()
        .zip(totals)
        .map(|(n, row)| (n.code.to_string(), row.into_iter().map(Some).collect()))
        .collect::<BTreeMap<_, _>>())
}

/// Borrow row `a` shared and row `b` mutably (`a != b`).
fn pick_two(rows: &mut [Vec<i64>], a: usize, b: usize) -> (&Vec<i64>, &mut Vec<i64>) {
    if a < b {
        let (lo, hi) = rows.split_at_mut(b);
        (&lo[a], &mut hi[0])
    } else {
        let (lo, hi) = rows.split_at_mut(a);
        (&hi[0], &mut lo[b])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{HierarchyKind, ROOT, UNASSIGNED};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn rec(day: u32, geo: &'static str, value: i64) -> FlatRecord {
        FlatRecord {
            date: d(day),
            geo,
            value,
        }
    }

    fn at(series: &GeoSeries, geo: &str) -> Vec<Option<i64>> {
        series[geo].clone()
    }

    #[test]
    fn single_province_rolls_up_to_region_and_country() {
        let records = [rec(1, "WV", 5)];
        let axis = DateAxis::build([d(1)]);
        let out = rollup(&records, &axis, HierarchyKind::Province.hierarchy()).unwrap();
        assert_eq!(at(&out, "WV"), vec![Some(5)]);
        assert_eq!(at(&out, "FL"), vec![Some(5)]);
        assert_eq!(at(&out, ROOT), vec![Some(5)]);
        assert_eq!(at(&out, "WA"), vec![Some(0)]);
        assert_eq!(at(&out, "BR"), vec![Some(0)]);
    }

    #[test]
    fn every_node_is_present_and_axis_long() {
        let h = HierarchyKind::Province.hierarchy();
        let axis = DateAxis::build([d(1), d(2), d(3)]);
        let out = rollup(&[rec(2, "AN", 1)], &axis, h).unwrap();
        assert_eq!(out.len(), h.len());
        for code in h.codes() {
            assert_eq!(out[code].len(), 3, "{code}");
        }
        assert_eq!(at(&out, "AN"), vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn parents_equal_children_sums() {
        let h = HierarchyKind::Province.hierarchy();
        let records = [
            rec(1, "AN", 3),
            rec(1, "AN", 4),
            rec(1, "LI", 2),
            rec(1, "BR", 10),
            rec(1, "HT", 7),
            rec(2, "NA", 1),
            rec(2, UNASSIGNED, 6),
        ];
        let axis = DateAxis::build(records.iter().map(|r| r.date));
        let out = rollup(&records, &axis, h).unwrap();

        assert_eq!(at(&out, "AN"), vec![Some(7), Some(0)]);
        assert_eq!(at(&out, "FL"), vec![Some(9), Some(0)]);
        assert_eq!(at(&out, "WA"), vec![Some(7), Some(1)]);
        assert_eq!(at(&out, ROOT), vec![Some(26), Some(7)]);

        for (i, node) in h.nodes().iter().enumerate() {
            let children = h.children_of(i);
            if children.is_empty() {
                continue;
            }
            for day in 0..axis.len() {
                let sum: i64 = children
                    .iter()
                    .map(|&c| out[h.nodes()[c].code][day].unwrap())
                    .sum();
                assert_eq!(out[node.code][day], Some(sum), "{} day {day}", node.code);
            }
        }
    }

    #[test]
    fn country_total_equals_input_total() {
        let records = [rec(1, "WV", 5), rec(1, "BR", 2), rec(1, "LX", 1), rec(1, UNASSIGNED, 4)];
        let axis = DateAxis::build([d(1)]);
        let out = rollup(&records, &axis, HierarchyKind::Province.hierarchy()).unwrap();
        let input: i64 = records.iter().map(|r| r.value).sum();
        assert_eq!(at(&out, ROOT), vec![Some(input)]);
    }

    #[test]
    fn unassigned_reaches_only_the_root() {
        let axis = DateAxis::build([d(1)]);
        let out = rollup(&[rec(1, UNASSIGNED, 9)], &axis, HierarchyKind::Region.hierarchy()).unwrap();
        assert_eq!(at(&out, UNASSIGNED), vec![Some(9)]);
        assert_eq!(at(&out, ROOT), vec![Some(9)]);
        for region in ["FL", "WA", "BR"] {
            assert_eq!(at(&out, region), vec![Some(0)]);
        }
    }

    #[test]
    fn direct_observations_at_inner_node_add_to_children() {
        // A region carrying its own records keeps them alongside its provinces.
        let records = [rec(1, "FL", 4), rec(1, "OV", 6)];
        let axis = DateAxis::build([d(1)]);
        let out = rollup(&records, &axis, HierarchyKind::Province.hierarchy()).unwrap();
        assert_eq!(at(&out, "OV"), vec![Some(6)]);
        assert_eq!(at(&out, "FL"), vec![Some(10)]);
        assert_eq!(at(&out, ROOT), vec![Some(10)]);
    }

    #[test]
    fn region_tree_for_deaths() {
        let records = [rec(1, "FL", 1), rec(1, "BR", 2), rec(2, "WA", 3)];
        let axis = DateAxis::build(records.iter().map(|r| r.date));
        let out = rollup(&records, &axis, HierarchyKind::Region.hierarchy()).unwrap();
        assert_eq!(at(&out, ROOT), vec![Some(3), Some(3)]);
        assert!(!out.contains_key("WV"));
    }

    #[test]
    fn foreign_codes_are_skipped() {
        let axis = DateAxis::build([d(1)]);
        let out = rollup(&[rec(1, "WV", 5)], &axis, HierarchyKind::Region.hierarchy()).unwrap();
        assert_eq!(at(&out, ROOT), vec![Some(0)]);
    }

    #[test]
    fn empty_axis_gives_empty_series() {
        let out = rollup(&[], &DateAxis::default(), HierarchyKind::Region.hierarchy()).unwrap();
        assert!(out.values().all(|s| s.is_empty()));
    }

    #[test]
    fn overflowing_leaf_is_reported() {
        let axis = DateAxis::build([d(1)]);
        let records = [rec(1, "WV", i64::MAX), rec(1, "WV", 1)];
        let err = rollup(&records, &axis, HierarchyKind::Province.hierarchy()).unwrap_err();
        assert_eq!(err, RollupOverflow { geo: "WV", date: d(1) });
    }

    #[test]
    fn overflowing_parent_sum_is_reported() {
        let big = i64::MAX / 2 + 1;
        let axis = DateAxis::build([d(1)]);
        let records = [rec(1, "WV", big), rec(1, "NA", big)];
        let err = rollup(&records, &axis, HierarchyKind::Province.hierarchy()).unwrap_err();
        assert_eq!(err.geo, ROOT);
    }
}
