//! Query result types.
//!
//! [`crate::ExemplarStorage::select`] returns a plain `Vec<Exemplar>` for one
//! series. Range queries over many series return one [`QueryResult`] per
//! matching series, and [`StorageStats`] summarizes buffer occupancy.

use serde::{Deserialize, Serialize};

use crate::exemplar::Exemplar;
use crate::labels::Labels;

/// Exemplars of one series that fell inside a queried time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Normalized labels of the series.
    pub series_labels: Labels,
    /// Exemplars ordered oldest to newest.
    pub exemplars: Vec<Exemplar>,
}

impl QueryResult {
    /// Creates a query result.
    pub fn new(series_labels: Labels, exemplars: Vec<Exemplar>) -> Self {
        Self {
            series_labels,
            exemplars,
        }
    }

    /// Returns the number of exemplars.
    pub fn len(&self) -> usize {
        self.exemplars.len()
    }

    /// Returns `true` if no exemplar is held.
    pub fn is_empty(&self) -> bool {
        self.exemplars.is_empty()
    }
}

/// Inclusive time range in milliseconds used by range queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// First timestamp included.
    pub start: i64,
    /// Last timestamp included.
    pub end: i64,
}

impl TimeRange {
    /// Creates a range covering `start..=end`.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Range covering every representable timestamp.
    pub fn all() -> Self {
        Self::new(i64::MIN, i64::MAX)
    }

    /// Returns `true` if the exemplar has a timestamp inside the range.
    ///
    /// Exemplars without a timestamp are never inside a range.
    pub fn contains(&self, exemplar: &Exemplar) -> bool {
        exemplar
            .timestamp
            .is_some_and(|ts| ts >= self.start && ts <= self.end)
    }
}

/// Snapshot of buffer occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Fixed number of slots.
    pub capacity: usize,
    /// Occupied slots.
    pub live_entries: usize,
    /// Series whose newest entry has not been overwritten.
    pub series: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange::new(10, 20);
        let at = |ts| Exemplar::with_timestamp(Labels::empty(), 1.0, ts);

        assert!(range.contains(&at(10)));
        assert!(range.contains(&at(20)));
        assert!(!range.contains(&at(9)));
        assert!(!range.contains(&at(21)));
        assert!(!range.contains(&Exemplar::new(Labels::empty(), 1.0)));
        assert!(TimeRange::all().contains(&at(i64::MIN)));
    }

    #[test]
    fn test_query_result_len() {
        let result = QueryResult::new(Labels::new([("job", "api")]), vec![]);
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
    }
}
