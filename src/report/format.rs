//! Formatted terminal output for snapshots.
//!
//! We keep formatting code in one place so output changes stay localized.

use crate::domain::{Hierarchy, Metric, Snapshot};
use crate::math::Transform;
use crate::report::query::{SeriesQuery, select};

/// Header plus one table per metric.
pub fn format_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    out.push_str("=== epi - Belgian epidemiological rollup ===\n");
    out.push_str(&format!("Fetched: {}\n", snapshot.timestamp.to_rfc3339()));
    match (snapshot.first_date(), snapshot.last_date()) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "Dates: {first} .. {last} ({} days)\n",
            snapshot.dates.len()
        )),
        _ => out.push_str("Dates: none\n"),
    }

    for metric in Metric::ALL {
        out.push('\n');
        out.push_str(&format_metric_table(snapshot, metric));
    }
    out
}

/// Latest reported value and trailing weekly average per geography, indented
/// by depth in the metric's hierarchy.
pub fn format_metric_table(snapshot: &Snapshot, metric: Metric) -> String {
    let hierarchy = metric.hierarchy_kind().hierarchy();
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", metric.display_name(), metric.key()));
    out.push_str(&format!(
        "  {:<26} {:>10} {:>10}  {}\n",
        "geography", "latest", "7d avg", "as of"
    ));

    for (idx, depth) in pre_order(hierarchy) {
        let node = &hierarchy.nodes()[idx];
        let raw = SeriesQuery::new(metric, node.code);
        let avg = SeriesQuery {
            transform: Transform::Trailing,
            ..raw.clone()
        };

        let latest = select(snapshot, &raw).ok().and_then(|v| v.latest());
        let smoothed = select(snapshot, &avg).ok().and_then(|v| v.latest());

        let label = format!("{}{} {}", "  ".repeat(depth), node.code, node.display_name);
        let (value, date) = match latest {
            Some((date, v)) => (v.to_string(), date.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let avg = smoothed.map(|(_, v)| v.to_string()).unwrap_or_else(|| "-".to_string());

        out.push_str(&format!(
            "  {:<26} {:>10} {:>10}  {}\n",
            truncate(&label, 26),
            value,
            avg,
            date
        ));
    }
    out
}

/// `(node index, depth)` from the root down, children in table order.
fn pre_order(hierarchy: &Hierarchy) -> Vec<(usize, usize)> {
    fn visit(h: &Hierarchy, idx: usize, depth: usize, out: &mut Vec<(usize, usize)>) {
        out.push((idx, depth));
        for &c in h.children_of(idx) {
            visit(h, c, depth + 1, out);
        }
    }

    let mut out = Vec::with_capacity(hierarchy.len());
    if let Some(&root) = hierarchy.bottom_up().last() {
        visit(hierarchy, root, 0, &mut out);
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
