//! Synthetic feeds with the published record shapes.
//!
//! Useful offline and for demos: two epidemic waves spread over the provinces
//! by population share, with hospital and mortality counts derived from
//! lagged cases. Output is fully determined by the seed.
//!
//! The generator also reproduces the quirks of the real feeds: several rows per
//! date/province (one per sex), a hospital feed that starts a week later, and a
//! trickle of case rows without a province.

use chrono::{Days, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Poisson;

use crate::data::{CasesRecord, DeathRecord, FeedError, FeedSource, HospitalRecord, RawFeeds};

/// (feed label, region label, population share)
const PROVINCES: &[(&str, &str, f64)] = &[
    ("Antwerpen", "Flanders", 0.163),
    ("Limburg", "Flanders", 0.077),
    ("OostVlaanderen", "Flanders", 0.135),
    ("VlaamsBrabant", "Flanders", 0.102),
    ("WestVlaanderen", "Flanders", 0.105),
    ("Brussels", "Brussels", 0.107),
    ("BrabantWallon", "Wallonia", 0.036),
    ("Hainaut", "Wallonia", 0.118),
    ("Liège", "Wallonia", 0.097),
    ("Luxembourg", "Wallonia", 0.026),
    ("Namur", "Wallonia", 0.043),
];

const REGIONS: [&str; 3] = ["Flanders", "Brussels", "Wallonia"];

const HOSPITAL_LAG_DAYS: usize = 7;
const HOSPITAL_RATE: f64 = 0.06;
const DISCHARGE_RATE: f64 = 0.08;
const ICU_SHARE: f64 = 0.22;
const DAILY_DEATH_RATE: f64 = 0.012;
const UNASSIGNED_SHARE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleConfig {
    pub start: NaiveDate,
    pub days: usize,
    pub seed: u64,
    /// National daily cases at the top of the larger wave.
    pub peak_cases: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap_or_default(),
            days: 240,
            seed: 42,
            peak_cases: 8000.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleFeeds {
    pub config: SampleConfig,
}

impl SampleFeeds {
    pub fn new(config: SampleConfig) -> Self {
        Self { config }
    }
}

impl FeedSource for SampleFeeds {
    fn fetch(&self) -> Result<RawFeeds, FeedError> {
        generate_feeds(&self.config)
    }

    fn describe(&self) -> String {
        format!(
            "sample (seed={}, {} days from {})",
            self.config.seed, self.config.days, self.config.start
        )
    }
}

/// Generate all three feeds.
pub fn generate_feeds(config: &SampleConfig) -> Result<RawFeeds, FeedError> {
    if config.days == 0 {
        return Ok(RawFeeds::default());
    }
    if !(config.peak_cases.is_finite() && config.peak_cases >= 0.0) {
        return Err(FeedError::Unavailable("sample peak must be a finite, non-negative count".into()));
    }
    if date_at(config.start, config.days - 1).is_none() {
        return Err(FeedError::Unavailable(format!(
            "sample of {} days from {} ends past the last representable date",
            config.days, config.start
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut feeds = RawFeeds::default();

    // Expected cases per province per day, kept for the lagged hospital series.
    let mut expected: Vec<Vec<f64>> = vec![Vec::with_capacity(config.days); PROVINCES.len()];
    let mut occupancy = vec![0.0_f64; PROVINCES.len()];

    for day in 0..config.days {
        let date = date_at(config.start, day)
            .ok_or_else(|| FeedError::Unavailable("sample date out of range".into()))?
            .to_string();
        let national = intensity(day, config.days, config.peak_cases);

        for (p, &(province, region, share)) in PROVINCES.iter().enumerate() {
            let lambda = national * share;
            expected[p].push(lambda);

            // One row per sex, as in the published feed.
            for half in [0.5, 0.5] {
                feeds.cases.push(CasesRecord {
                    date: Some(date.clone()),
                    province: Some(province.to_string()),
                    region: Some(region.to_string()),
                    cases: Some(draw(&mut rng, lambda * half)?),
                });
            }

            if day < HOSPITAL_LAG_DAYS {
                continue;
            }
            let new_in = draw(&mut rng, expected[p][day - HOSPITAL_LAG_DAYS] * HOSPITAL_RATE)?;
            occupancy[p] = occupancy[p] * (1.0 - DISCHARGE_RATE) + new_in as f64;
            let total_in = occupancy[p].round() as i64;
            feeds.hospital.push(HospitalRecord {
                date: Some(date.clone()),
                province: Some(province.to_string()),
                region: Some(region.to_string()),
                total_in: Some(total_in),
                total_in_icu: Some((occupancy[p] * ICU_SHARE).round() as i64),
                new_in: Some(new_in),
            });
        }

        feeds.cases.push(CasesRecord {
            date: Some(date.clone()),
            province: None,
            region: None,
            cases: Some(draw(&mut rng, national * UNASSIGNED_SHARE)?),
        });

        if day < HOSPITAL_LAG_DAYS {
            continue;
        }
        for region in REGIONS {
            let occupied: f64 = PROVINCES
                .iter()
                .zip(&occupancy)
                .filter(|((_, r, _), _)| *r == region)
                .map(|(_, occ)| *occ)
                .sum();
            feeds.deaths.push(DeathRecord {
                date: Some(date.clone()),
                region: Some(region.to_string()),
                deaths: Some(draw(&mut rng, occupied * DAILY_DEATH_RATE)?),
            });
        }
    }

    Ok(feeds)
}

/// Two Gaussian waves on top of a small endemic floor.
fn date_at(start: NaiveDate, offset: usize) -> Option<NaiveDate> {
    start.checked_add_days(Days::new(u64::try_from(offset).ok()?))
}

fn intensity(day: usize, days: usize, peak: f64) -> f64 {
    let t = day as f64;
    let n = days.max(1) as f64;
    let wave = |center: f64, width: f64, height: f64| {
        let z = (t - center) / width.max(1.0);
        height * (-0.5 * z * z).exp()
    };
    let floor = peak * 0.005;
    floor + wave(0.2 * n, 0.06 * n, peak * 0.35) + wave(0.7 * n, 0.09 * n, peak)
}

fn draw(rng: &mut StdRng, lambda: f64) -> Result<i64, FeedError> {
    if lambda <= 0.0 {
        return Ok(0);
    }
    let poisson = Poisson::new(lambda)
        .map_err(|e| FeedError::Unavailable(format!("sample distribution error: {e}")))?;
    Ok(poisson.sample(rng) as i64)
}
