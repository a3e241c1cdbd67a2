use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Cannot compute {0} over an empty sample set")]
    EmptySampleSet(&'static str),
    #[error("Percentile must be between 0 and 100, got {0}")]
    InvalidPercentile(f64),
}

/// Descriptive statistics over a set of duration samples.
///
/// Samples are kept sorted at nanosecond precision. Every statistic other than
/// [Stats::error_rate] and [Stats::count] fails on an empty sample set instead of inventing a
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stats {
    sorted: Vec<Duration>,
    error_count: usize,
}

impl Stats {
    pub fn new(mut samples: Vec<Duration>, error_count: usize) -> Self {
        samples.sort_unstable();
        Self {
            sorted: samples,
            error_count,
        }
    }

    pub fn count(&self) -> usize {
        self.sorted.len()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn samples(&self) -> &[Duration] {
        &self.sorted
    }

    pub fn min(&self) -> Result<Duration, StatsError> {
        self.sorted
            .first()
            .copied()
            .ok_or(StatsError::EmptySampleSet("min"))
    }

    pub fn max(&self) -> Result<Duration, StatsError> {
        self.sorted
            .last()
            .copied()
            .ok_or(StatsError::EmptySampleSet("max"))
    }

    pub fn mean(&self) -> Result<Duration, StatsError> {
        if self.sorted.is_empty() {
            return Err(StatsError::EmptySampleSet("mean"));
        }

        let total = self.sorted.iter().map(Duration::as_nanos).sum::<u128>();
        Ok(nanos_to_duration(total / self.sorted.len() as u128))
    }

    pub fn median(&self) -> Result<Duration, StatsError> {
        let n = self.sorted.len();
        if n == 0 {
            return Err(StatsError::EmptySampleSet("median"));
        }

        if n % 2 == 1 {
            Ok(self.sorted[n / 2])
        } else {
            let sum = self.sorted[n / 2 - 1].as_nanos() + self.sorted[n / 2].as_nanos();
            Ok(nanos_to_duration(sum / 2))
        }
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> Result<Duration, StatsError> {
        if self.sorted.is_empty() {
            return Err(StatsError::EmptySampleSet("standard deviation"));
        }

        let n = self.sorted.len() as f64;
        let mean = self.sorted.iter().map(|d| d.as_nanos() as f64).sum::<f64>() / n;
        let variance = self
            .sorted
            .iter()
            .map(|d| {
                let diff = d.as_nanos() as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;

        Ok(nanos_to_duration(variance.sqrt().round() as u128))
    }

    /// Percentile `p` in `[0, 100]`, linearly interpolated between the nearest ranks.
    pub fn percentile(&self, p: f64) -> Result<Duration, StatsError> {
        if !(0.0..=100.0).contains(&p) {
            return Err(StatsError::InvalidPercentile(p));
        }

        let n = self.sorted.len();
        if n == 0 {
            return Err(StatsError::EmptySampleSet("percentile"));
        }
        if n == 1 {
            return Ok(self.sorted[0]);
        }

        let rank = p / 100.0 * (n - 1) as f64;
        let lower_idx = rank.floor() as usize;
        let upper_idx = (lower_idx + 1).min(n - 1);
        let fraction = rank - lower_idx as f64;

        let lower = self.sorted[lower_idx].as_nanos() as f64;
        let upper = self.sorted[upper_idx].as_nanos() as f64;

        Ok(nanos_to_duration(
            (lower + fraction * (upper - lower)).round() as u128,
        ))
    }

    /// Fraction of samples that carried an error, zero when there are no samples.
    pub fn error_rate(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }

        self.error_count as f64 / self.sorted.len() as f64
    }
}

fn nanos_to_duration(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_millis).collect()
    }

    #[test]
    fn empty_samples_fail() {
        let stats = Stats::default();

        assert_eq!(Err(StatsError::EmptySampleSet("min")), stats.min());
        assert_eq!(Err(StatsError::EmptySampleSet("max")), stats.max());
        assert_eq!(Err(StatsError::EmptySampleSet("mean")), stats.mean());
        assert_eq!(Err(StatsError::EmptySampleSet("median")), stats.median());
        assert!(stats.std_dev().is_err());
        assert!(stats.percentile(90.0).is_err());
        assert_eq!(0.0, stats.error_rate());
        assert_eq!(0, stats.count());
    }

    #[test]
    fn basic_statistics() {
        let stats = Stats::new(millis(&[5, 1, 3, 2, 4]), 0);

        assert_eq!(Duration::from_millis(1), stats.min().unwrap());
        assert_eq!(Duration::from_millis(5), stats.max().unwrap());
        assert_eq!(Duration::from_millis(3), stats.mean().unwrap());
        assert_eq!(Duration::from_millis(3), stats.median().unwrap());
        assert_eq!(5, stats.count());
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let stats = Stats::new(millis(&[4, 1, 3, 2]), 0);
        assert_eq!(Duration::from_micros(2500), stats.median().unwrap());
    }

    #[test]
    fn population_standard_deviation() {
        // Values 2, 4, 4, 4, 5, 5, 7, 9 have a population standard deviation of exactly 2.
        let stats = Stats::new(millis(&[2, 4, 4, 4, 5, 5, 7, 9]), 0);
        assert_eq!(Duration::from_millis(2), stats.std_dev().unwrap());

        let single = Stats::new(millis(&[7]), 0);
        assert_eq!(Duration::ZERO, single.std_dev().unwrap());
    }

    #[test]
    fn percentile_interpolates() {
        let stats = Stats::new(millis(&(1..=5).collect::<Vec<_>>()), 0);

        assert_eq!(Duration::from_millis(1), stats.percentile(0.0).unwrap());
        assert_eq!(Duration::from_millis(3), stats.percentile(50.0).unwrap());
        assert_eq!(Duration::from_millis(5), stats.percentile(100.0).unwrap());
        // rank = 0.9 * 4 = 3.6, between 4ms and 5ms
        assert_eq!(Duration::from_micros(4600), stats.percentile(90.0).unwrap());
    }

    #[test]
    fn percentile_rejects_out_of_range() {
        let stats = Stats::new(millis(&[1, 2]), 0);
        assert_eq!(
            Err(StatsError::InvalidPercentile(101.0)),
            stats.percentile(101.0)
        );
        assert!(stats.percentile(-1.0).is_err());
        assert!(stats.percentile(f64::NAN).is_err());
    }

    #[test]
    fn single_sample_percentile() {
        let stats = Stats::new(millis(&[42]), 0);
        assert_eq!(Duration::from_millis(42), stats.percentile(99.0).unwrap());
    }

    #[test]
    fn error_rate_is_fraction_of_errors() {
        let stats = Stats::new(millis(&[1; 10]), 1);
        assert_eq!(0.1, stats.error_rate());
        assert_eq!(1, stats.error_count());
    }
}
