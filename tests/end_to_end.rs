use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use epi_rollup::data::{FeedSource, FileFeeds};
use epi_rollup::domain::{Metric, SkipLast};
use epi_rollup::math::Transform;
use epi_rollup::report::{SeriesQuery, select};
use epi_rollup::service::Aggregator;

fn feeds_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("epi-e2e-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_feeds(dir: &PathBuf, cases: &str, hospital: &str, deaths: &str) {
    fs::write(dir.join("cases.json"), cases).unwrap();
    fs::write(dir.join("hospital.json"), hospital).unwrap();
    fs::write(dir.join("deaths.json"), deaths).unwrap();
}

#[test]
fn single_west_flanders_day_rolls_up() {
    let dir = feeds_dir("wv");
    write_feeds(
        &dir,
        r#"[{"DATE":"2021-01-01","PROVINCE":"WestVlaanderen","REGION":"Flanders","AGEGROUP":"20-29","SEX":"F","CASES":5}]"#,
        r#"[{"DATE":"2021-01-01","PROVINCE":"WestVlaanderen","REGION":"Flanders","TOTAL_IN":2,"TOTAL_IN_ICU":0,"NEW_IN":2}]"#,
        r#"[{"DATE":"2021-01-01","REGION":"Flanders","AGEGROUP":"85+","SEX":"M","DEATHS":1}]"#,
    );

    let agg = Aggregator::new(Box::new(FileFeeds::in_dir(&dir)), SkipLast::uniform(0));
    assert!(!agg.is_ready());
    let snap = agg.refresh().unwrap();
    assert!(agg.is_ready());

    assert_eq!(snap.dates.len(), 1);
    assert_eq!(snap.dates[0].to_string(), "2021-01-01");
    for geo in ["WV", "FL", "BE"] {
        assert_eq!(snap.series(Metric::NewCases, geo), Some(&vec![Some(5)]), "{geo}");
        assert_eq!(snap.series(Metric::NewHospital, geo), Some(&vec![Some(2)]), "{geo}");
    }
    assert_eq!(snap.series(Metric::NewCases, "BR"), Some(&vec![Some(0)]));
    assert_eq!(snap.series(Metric::Deaths, "FL"), Some(&vec![Some(1)]));
    assert_eq!(snap.series(Metric::Deaths, "BE"), Some(&vec![Some(1)]));
    assert!(snap.series(Metric::Deaths, "WV").is_none());
}

#[test]
fn failed_refresh_keeps_previous_snapshot() {
    let dir = feeds_dir("fail");
    write_feeds(
        &dir,
        r#"[{"DATE":"2021-01-01","PROVINCE":"Namur","REGION":"Wallonia","CASES":3}]"#,
        "[]",
        "[]",
    );
    let agg = Aggregator::new(Box::new(FileFeeds::in_dir(&dir)), SkipLast::uniform(0));
    let first = agg.refresh().unwrap();

    fs::write(dir.join("hospital.json"), "{not json").unwrap();
    assert!(agg.refresh().is_err());
    assert!(agg.is_ready());
    assert!(Arc::ptr_eq(&first, &agg.snapshot().unwrap()));

    let status = agg.status();
    assert_eq!((status.attempts, status.successes, status.failures), (2, 1, 1));
    assert!(status.last_failure.is_some());
}

#[test]
fn sample_feeds_support_smoothed_range_queries() {
    let source = epi_rollup::data::SampleFeeds::new(epi_rollup::data::SampleConfig {
        days: 30,
        ..Default::default()
    });
    assert!(source.describe().starts_with("sample"));
    let agg = Aggregator::new(Box::new(source), SkipLast::default());
    let snap = agg.refresh().unwrap();
    let dates = &snap.dates;

    let query = SeriesQuery {
        transform: Transform::Trailing,
        from: Some(dates[10]),
        to: Some(dates[19]),
        ..SeriesQuery::new(Metric::NewCases, "BE")
    };
    let view = select(&snap, &query).unwrap();
    assert_eq!(view.dates.len(), 10);
    // Smoothing runs over the full series, so the window is already warm at
    // the start of the slice.
    assert!(view.values.iter().all(|v| v.is_some()));

    // New cases drop their last three days by default.
    let tail = select(&snap, &SeriesQuery::new(Metric::NewCases, "BE")).unwrap();
    assert_eq!(&tail.values[27..], &[None, None, None]);
}
