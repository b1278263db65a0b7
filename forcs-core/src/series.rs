//! Year-keyed input series.
//!
//! Growth and climate inputs arrive as sparse, year-stamped rows: a value
//! entered for year 10 stays in force until a later row replaces it. A
//! lookup therefore answers "what is the most recent entry at or before
//! this year", not "what is the entry for this year". Spin-up years are
//! negative, so queries and keys are signed.

use serde::{Deserialize, Serialize};

/// Simulation year. Year 0 is the first projected year; spin-up replays
/// use negative years.
pub type Year = i32;

/// Scalar value used throughout the engine.
pub type FloatValue = f64;

/// A sparse series of values keyed by year, answering nearest-prior-year
/// lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearSeries<T> {
    // Kept sorted by year; at most one entry per year.
    entries: Vec<(Year, T)>,
}

impl<T> YearSeries<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an entry for the given year, replacing any existing entry with
    /// the same year.
    pub fn insert(&mut self, year: Year, value: T) {
        match self.entries.binary_search_by_key(&year, |(y, _)| *y) {
            Ok(idx) => self.entries[idx] = (year, value),
            Err(idx) => self.entries.insert(idx, (year, value)),
        }
    }

    /// Returns the entry with the largest year that is less than or equal
    /// to `year`, or `None` if every entry is later than `year`.
    pub fn latest_at(&self, year: Year) -> Option<&T> {
        self.entries
            .iter()
            .rev()
            .find(|(y, _)| *y <= year)
            .map(|(_, v)| v)
    }

    /// Year of the earliest entry.
    pub fn first_year(&self) -> Option<Year> {
        self.entries.first().map(|(y, _)| *y)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Year, &T)> {
        self.entries.iter().map(|(y, v)| (*y, v))
    }
}

impl<T> FromIterator<(Year, T)> for YearSeries<T> {
    fn from_iter<I: IntoIterator<Item = (Year, T)>>(iter: I) -> Self {
        let mut series = Self::new();
        for (year, value) in iter {
            series.insert(year, value);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_series() -> YearSeries<f64> {
        [(0, 250.0), (10, 300.0), (50, 180.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn exact_year_is_returned() {
        let series = example_series();
        assert_eq!(series.latest_at(10), Some(&300.0));
    }

    #[test]
    fn prior_year_is_returned_between_entries() {
        let series = example_series();
        assert_eq!(series.latest_at(9), Some(&250.0));
        assert_eq!(series.latest_at(49), Some(&300.0));
    }

    #[test]
    fn later_years_keep_the_last_entry_in_force() {
        let series = example_series();
        assert_eq!(series.latest_at(5000), Some(&180.0));
    }

    #[test]
    fn years_before_the_first_entry_have_no_value() {
        let series = example_series();
        assert_eq!(series.latest_at(-1), None);
    }

    #[test]
    fn negative_spinup_years_resolve_against_negative_keys() {
        let mut series = example_series();
        series.insert(-200, 100.0);
        assert_eq!(series.latest_at(-120), Some(&100.0));
        assert_eq!(series.latest_at(-201), None);
    }

    #[test]
    fn inserting_the_same_year_replaces_the_entry() {
        let mut series = example_series();
        series.insert(10, 475.0);
        assert_eq!(series.len(), 3);
        assert_eq!(series.latest_at(10), Some(&475.0));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let unordered: YearSeries<f64> = [(50, 180.0), (0, 250.0), (10, 300.0)]
            .into_iter()
            .collect();
        assert_eq!(unordered.latest_at(20), Some(&300.0));
        assert_eq!(unordered.first_year(), Some(0));
    }
}
