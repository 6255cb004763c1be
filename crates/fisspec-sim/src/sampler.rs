//! Row sampler: which simulation steps become output rows.
//!
//! The sampling interval is `x = max(1, floor(steps / output_rows))` and step
//! `i` is materialized iff `i % x == 0`. Step 0 is always materialized, so a
//! run yields `ceil(steps / x)` rows. That can differ from `output_rows`
//! (5_256_000 steps at 5_000 rows gives `x = 1051` and 5_001 rows); the
//! count is an approximation, not an exact decimation.

use fisspec_core::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowSampler {
    steps: u64,
    interval: u64,
}

impl RowSampler {
    /// Both counts must be at least 1. `output_rows >= steps` clamps the
    /// interval to 1 (every step materialized).
    ///
    /// # Examples
    ///
    /// ```
    /// use fisspec_sim::RowSampler;
    /// let sampler = RowSampler::new(5_256_000, 5_000).unwrap();
    /// assert_eq!(sampler.interval(), 1051);
    /// assert_eq!(RowSampler::new(10, 1_000).unwrap().interval(), 1);
    /// ```
    pub fn new(steps: u64, output_rows: u64) -> Result<Self, ConfigError> {
        if steps == 0 {
            return Err(ConfigError::NonPositiveSteps(0.0));
        }
        if output_rows == 0 {
            return Err(ConfigError::InvalidOutputRows(0));
        }
        let interval = (steps / output_rows).max(1);
        Ok(Self { steps, interval })
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Whether step `step` (0-based) is recorded as an output row.
    pub fn is_materialized(&self, step: u64) -> bool {
        step < self.steps && step % self.interval == 0
    }

    /// Number of rows a full run produces.
    pub fn row_count(&self) -> u64 {
        self.steps.div_ceil(self.interval)
    }

    /// Materialized step indices in ascending order.
    pub fn materialized_steps(&self) -> impl Iterator<Item = u64> {
        let interval = self.interval;
        (0..self.row_count()).map(move |row| row * interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn equal_steps_and_rows_materialize_everything() {
        let s = RowSampler::new(180, 180).unwrap();
        assert_eq!(s.interval(), 1);
        assert_eq!(s.row_count(), 180);
        assert!((0..180).all(|i| s.is_materialized(i)));
        assert!(!s.is_materialized(180));
    }

    #[test]
    fn year_of_six_second_steps() {
        let s = RowSampler::new(5_256_000, 5_000).unwrap();
        assert_eq!(s.interval(), 1051);
        assert_eq!(s.row_count(), 5_001);
        assert!(s.materialized_steps().all(|i| i % 1051 == 0 && i < 5_256_000));
        assert_eq!(s.materialized_steps().last(), Some(5_000 * 1051));
        assert!(s.is_materialized(1051));
        assert!(!s.is_materialized(1050));
    }

    #[test]
    fn more_rows_than_steps_clamps_to_one() {
        let s = RowSampler::new(7, 1_000_000).unwrap();
        assert_eq!(s.interval(), 1);
        assert_eq!(s.row_count(), 7);
    }

    #[test]
    fn zero_counts_are_configuration_errors() {
        assert_eq!(
            RowSampler::new(0, 10),
            Err(ConfigError::NonPositiveSteps(0.0))
        );
        assert_eq!(
            RowSampler::new(10, 0),
            Err(ConfigError::InvalidOutputRows(0))
        );
    }

    proptest! {
        #[test]
        fn row_count_matches_materialized_steps(steps in 1u64..20_000, rows in 1u64..5_000) {
            let s = RowSampler::new(steps, rows).unwrap();
            prop_assert!(s.interval() >= 1);
            let counted = (0..steps).filter(|i| s.is_materialized(*i)).count() as u64;
            prop_assert_eq!(counted, s.row_count());
            let listed: Vec<u64> = s.materialized_steps().collect();
            prop_assert_eq!(listed.len() as u64, counted);
            prop_assert!(listed.iter().all(|i| s.is_materialized(*i)));
        }
    }
}
