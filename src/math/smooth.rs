//! Rolling weekly averages over aligned series.
//!
//! All transforms return a series of the same length as their input. A window
//! containing a missing point (or running off either end) yields a missing
//! point. Averages are rounded up, so a week of small non-zero counts never
//! averages to zero.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::Series;

const WEEK: usize = 7;

/// Presentation-time smoothing applied to a published series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    /// Raw daily values.
    #[default]
    Identity,
    /// Mean of the current day and the six before it.
    Trailing,
    /// Mean of the current day and three on either side.
    Centered,
}

impl Transform {
    pub const ALL: [Transform; 3] = [Transform::Identity, Transform::Trailing, Transform::Centered];

    pub fn apply(self, series: &[Option<i64>]) -> Series {
        match self {
            Transform::Identity => series.to_vec(),
            Transform::Trailing => trailing_weekly_average(series),
            Transform::Centered => centered_weekly_average(series),
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Transform::Identity => "identity",
            Transform::Trailing => "trailing",
            Transform::Centered => "centered",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Transform::Identity => "daily",
            Transform::Trailing => "7-day trailing avg",
            Transform::Centered => "7-day centered avg",
        }
    }

    pub fn from_key(key: &str) -> Option<Transform> {
        Transform::ALL.into_iter().find(|t| t.key() == key)
    }

    pub fn next(self) -> Transform {
        match self {
            Transform::Identity => Transform::Trailing,
            Transform::Trailing => Transform::Centered,
            Transform::Centered => Transform::Identity,
        }
    }
}

/// Point `i` averages `i-6..=i`.
pub fn trailing_weekly_average(series: &[Option<i64>]) -> Series {
    (0..series.len())
        .map(|i| {
            if i + 1 < WEEK {
                return None;
            }
            window_mean(&series[i + 1 - WEEK..=i])
        })
        .collect()
}

/// Point `i` averages `i-3..=i+3`.
pub fn centered_weekly_average(series: &[Option<i64>]) -> Series {
    let half = WEEK / 2;
    (0..series.len())
        .map(|i| {
            if i < half || i + half >= series.len() {
                return None;
            }
            window_mean(&series[i - half..=i + half])
        })
        .collect()
}

fn window_mean(window: &[Option<i64>]) -> Option<i64> {
    // Seven i64 values always fit in an i128, and so does their mean in an i64.
    let sum = window.iter().map(|v| v.map(i128::from)).sum::<Option<i128>>()?;
    i64::try_from(ceil_div(sum, window.len() as i128)).ok()
}

fn ceil_div(num: i128, den: i128) -> i128 {
    let q = num.div_euclid(den);
    if num.rem_euclid(den) == 0 { q } else { q + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_to(n: i64) -> Series {
        (1..=n).map(Some).collect()
    }

    #[test]
    fn trailing_on_one_to_eight() {
        let out = trailing_weekly_average(&one_to(8));
        assert_eq!(out.len(), 8);
        assert!(out[..6].iter().all(Option::is_none));
        // ceil(28 / 7) = 4, ceil(35 / 7) = 5
        assert_eq!(out[6], Some(4));
        assert_eq!(out[7], Some(5));
    }

    #[test]
    fn centered_boundaries_on_length_eight() {
        let values = one_to(8);
        let out = centered_weekly_average(&values);
        assert_eq!(out.len(), 8);
        for i in [0, 1, 2, 5, 6, 7] {
            assert_eq!(out[i], None, "index {i}");
        }
        // Index 3 covers 0..=6, index 4 covers 1..=7 (i <= len - 4).
        assert_eq!(out[3], Some(4));
        assert_eq!(out[4], Some(5));
    }

    #[test]
    fn averages_round_up() {
        let series = vec![Some(1), Some(0), Some(0), Some(0), Some(0), Some(0), Some(0)];
        assert_eq!(trailing_weekly_average(&series)[6], Some(1));
        assert_eq!(centered_weekly_average(&series)[3], Some(1));
        assert_eq!(ceil_div(14, 7), 2);
        assert_eq!(ceil_div(-8, 7), -1);
    }

    #[test]
    fn missing_point_poisons_every_window_it_is_in() {
        let mut series = one_to(14);
        series[7] = None;
        let trailing = trailing_weekly_average(&series);
        for (i, v) in trailing.iter().enumerate() {
            let covers_gap = (7..=13).contains(&i);
            assert_eq!(v.is_none(), i < 6 || covers_gap, "index {i}");
        }

        let centered = centered_weekly_average(&series);
        for (i, v) in centered.iter().enumerate() {
            let covers_gap = (4..=10).contains(&i);
            assert_eq!(v.is_none(), i < 3 || i > 10 || covers_gap, "index {i}");
        }
    }

    #[test]
    fn short_series_are_all_missing() {
        assert_eq!(trailing_weekly_average(&one_to(6)), vec![None; 6]);
        assert_eq!(centered_weekly_average(&one_to(6)), vec![None; 6]);
        assert!(centered_weekly_average(&[]).is_empty());
    }

    #[test]
    fn identity_copies_and_input_is_untouched() {
        let input = vec![Some(3), None, Some(1)];
        let before = input.clone();
        assert_eq!(Transform::Identity.apply(&input), input);
        let _ = Transform::Centered.apply(&input);
        let _ = Transform::Trailing.apply(&input);
        assert_eq!(input, before);
    }

    #[test]
    fn transform_keys_round_trip() {
        for t in Transform::ALL {
            assert_eq!(Transform::from_key(t.key()), Some(t));
        }
        assert_eq!(Transform::Centered.next(), Transform::Identity);
    }

    #[test]
    fn extreme_counts_average_without_overflow() {
        let series = vec![Some(i64::MAX); 8];
        let out = trailing_weekly_average(&series);
        assert_eq!(out[6], Some(i64::MAX));
        assert_eq!(centered_weekly_average(&series)[3], Some(i64::MAX));
    }
}
