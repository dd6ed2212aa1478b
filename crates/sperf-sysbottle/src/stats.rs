//! Nearest-rank percentile statistics.
//!
//! Percentiles index into the sorted samples instead of interpolating: for
//! rank `r` over `n` samples the value at index `ceil(r * n) - 1`, clamped to
//! `[0, n - 1]`, is selected.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Ranks reported in the percentile tables, with their column labels.
pub const REPORTED_RANKS: [(&str, f64); 6] = [
    ("max", 1.0),
    ("p99", 0.99),
    ("p75", 0.75),
    ("p50", 0.50),
    ("p25", 0.25),
    ("min", 0.0),
];

/// Returns the index selected by a nearest-rank lookup.
fn nearest_rank_index(len: usize, rank: f64) -> usize {
    let position = (rank * len as f64).ceil() as i64 - 1;
    position.clamp(0, len as i64 - 1) as usize
}

fn check_rank(rank: f64) -> Result<(), AnalysisError> {
    if (0.0..=1.0).contains(&rank) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidRank(rank.to_string()))
    }
}

/// Returns the nearest-rank percentile of an already sorted slice.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptySeries`] for an empty slice and
/// [`AnalysisError::InvalidRank`] for a rank outside `[0, 1]`.
pub fn percentile_sorted(sorted: &[f64], rank: f64) -> Result<f64, AnalysisError> {
    check_rank(rank)?;
    if sorted.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }
    Ok(sorted[nearest_rank_index(sorted.len(), rank)])
}

/// Returns the nearest-rank percentile of unsorted samples.
///
/// ```rust
/// use sperf_sysbottle::stats::percentile;
///
/// let samples = [5.0, 1.0, 4.0, 2.0, 3.0];
/// assert_eq!(percentile(&samples, 0.5).unwrap(), 3.0);
/// assert_eq!(percentile(&samples, 1.0).unwrap(), 5.0);
/// assert_eq!(percentile(&samples, 0.0).unwrap(), 1.0);
/// assert!(percentile(&[], 0.5).is_err());
/// ```
///
/// # Errors
///
/// Same as [`percentile_sorted`].
pub fn percentile(samples: &[f64], rank: f64) -> Result<f64, AnalysisError> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, rank)
}

/// The percentiles printed for one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileSummary {
    /// Largest sample.
    pub max: f64,
    /// 99th percentile.
    pub p99: f64,
    /// 75th percentile.
    pub p75: f64,
    /// Median.
    pub p50: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Smallest sample.
    pub min: f64,
}

impl PercentileSummary {
    /// Summarises a series, sorting it once.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EmptySeries`] if there are no samples.
    pub fn from_samples(samples: &[f64]) -> Result<Self, AnalysisError> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Ok(Self {
            max: percentile_sorted(&sorted, 1.0)?,
            p99: percentile_sorted(&sorted, 0.99)?,
            p75: percentile_sorted(&sorted, 0.75)?,
            p50: percentile_sorted(&sorted, 0.50)?,
            p25: percentile_sorted(&sorted, 0.25)?,
            min: percentile_sorted(&sorted, 0.0)?,
        })
    }

    /// Returns the values in [`REPORTED_RANKS`] order.
    #[must_use]
    pub const fn values(&self) -> [f64; 6] {
        [self.max, self.p99, self.p75, self.p50, self.p25, self.min]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0.5, 3.0 ; "median")]
    #[test_case(1.0, 5.0 ; "max")]
    #[test_case(0.0, 1.0 ; "min")]
    #[test_case(0.2, 1.0 ; "first bucket")]
    #[test_case(0.21, 2.0 ; "just past first bucket")]
    #[test_case(0.99, 5.0 ; "p99 of five")]
    fn nearest_rank_on_one_to_five(rank: f64, expected: f64) {
        assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], rank).unwrap(), expected);
    }

    #[test]
    fn input_order_does_not_matter() {
        assert_eq!(percentile(&[4.0, 5.0, 1.0, 3.0, 2.0], 0.5).unwrap(), 3.0);
    }

    #[test]
    fn single_sample_is_every_percentile() {
        let summary = PercentileSummary::from_samples(&[7.5]).unwrap();
        assert!(summary.values().iter().all(|v| *v == 7.5));
    }

    #[test]
    fn empty_series_is_an_error() {
        assert_eq!(percentile(&[], 0.5), Err(AnalysisError::EmptySeries));
        assert_eq!(
            PercentileSummary::from_samples(&[]),
            Err(AnalysisError::EmptySeries)
        );
    }

    #[test_case(-0.1 ; "negative")]
    #[test_case(1.5 ; "above one")]
    #[test_case(f64::NAN ; "nan")]
    fn invalid_rank_is_an_error(rank: f64) {
        assert!(matches!(
            percentile(&[1.0], rank),
            Err(AnalysisError::InvalidRank(_))
        ));
    }

    #[test]
    fn summary_of_hundred_samples() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        let summary = PercentileSummary::from_samples(&samples).unwrap();

        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.p99, 99.0);
        assert_eq!(summary.p75, 75.0);
        assert_eq!(summary.p50, 50.0);
        assert_eq!(summary.p25, 25.0);
        assert_eq!(summary.min, 1.0);
    }

    proptest! {
        #[test]
        fn percentile_is_a_member_within_bounds(
            samples in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
            rank in 0.0f64..=1.0,
        ) {
            let value = percentile(&samples, rank).unwrap();
            let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            prop_assert!(samples.contains(&value));
            prop_assert!(value >= min && value <= max);
        }

        #[test]
        fn summary_is_monotonic(samples in prop::collection::vec(0.0f64..1000.0, 1..100)) {
            let summary = PercentileSummary::from_samples(&samples).unwrap();
            let values = summary.values();
            for pair in values.windows(2) {
                prop_assert!(pair[0] >= pair[1]);
            }
        }
    }
}
