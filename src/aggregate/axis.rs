//! Shared date axis.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

/// Sorted, distinct dates shared by every series of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateAxis {
    dates: Vec<NaiveDate>,
    index: HashMap<NaiveDate, usize>,
}

impl DateAxis {
    /// Union of all given dates, ascending, without duplicates.
    pub fn build(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let dates: Vec<NaiveDate> = dates.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        Self { dates, index }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.index.get(&date).copied()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn into_dates(self) -> Vec<NaiveDate> {
        self.dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    #[test]
    fn union_is_sorted_and_distinct() {
        let cases = [d(3), d(1), d(3)];
        let hospital = [d(2)];
        let deaths = [d(5), d(1)];
        let axis = DateAxis::build(cases.into_iter().chain(hospital).chain(deaths));
        assert_eq!(axis.dates(), &[d(1), d(2), d(3), d(5)]);
        assert!(axis.dates().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(axis.position(d(5)), Some(3));
        assert_eq!(axis.position(d(4)), None);
    }

    #[test]
    fn calendar_order_matches_iso_string_order() {
        let axis = DateAxis::build([d(10), d(9), NaiveDate::from_ymd_opt(2020, 12, 31).unwrap()]);
        let as_strings: Vec<String> = axis.dates().iter().map(|d| d.to_string()).collect();
        let mut sorted = as_strings.clone();
        sorted.sort();
        assert_eq!(as_strings, sorted);
    }

    #[test]
    fn empty_input_gives_empty_axis() {
        let axis = DateAxis::build(std::iter::empty());
        assert!(axis.is_empty());
    }
}
