//! Running statistics using Welford's online algorithm.
//!
//! Used to normalize rewards and, per dimension, states. Updates are O(1) in
//! time and memory: the history is never revisited.
//!
//! # Discounting
//!
//! [`RunningStatistics::add_raw_value`] takes a `discount` in `(0, 1]`. It
//! decays the *effective count* of the samples seen so far before the new
//! sample is folded in with weight one, so a sample seen `k` updates ago
//! contributes with weight `discount^k`. With `discount = 1` this is plain
//! Welford and the results match the batch mean and sample variance.
//!
//! # Lifecycle
//!
//! One instance is built per run and carried across episodes by its owner.
//! Nothing here resets it.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default epsilon added to the standard deviation when normalizing.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Streaming mean and variance of a scalar signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStatistics {
    /// Raw number of samples folded in
    count: u64,
    /// Geometrically decayed effective count
    weight: f64,
    mean: f64,
    /// Weighted sum of squared deviations from the mean
    sum_sq_dev: f64,
    epsilon: f64,
}

impl Default for RunningStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStatistics {
    pub fn new() -> Self {
        Self::with_epsilon(DEFAULT_EPSILON)
    }

    /// Create with a custom epsilon for numerical stability.
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            count: 0,
            weight: 0.0,
            mean: 0.0,
            sum_sq_dev: 0.0,
            epsilon,
        }
    }

    /// Fold one value into the statistics.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDiscount`] when `discount` is not finite or outside
    /// `(0, 1]`. The statistics are left untouched in that case.
    pub fn add_raw_value(&mut self, x: f64, discount: f64) -> Result<()> {
        if !discount.is_finite() || discount <= 0.0 || discount > 1.0 {
            return Err(Error::InvalidDiscount(discount));
        }

        self.count += 1;
        self.weight = discount * self.weight + 1.0;
        let delta = x - self.mean;
        self.mean += delta / self.weight;
        let delta2 = x - self.mean;
        self.sum_sq_dev = discount * self.sum_sq_dev + delta * delta2;
        Ok(())
    }

    /// Number of raw samples seen
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Decayed sample count; equals `count` when every discount was 1
    pub fn effective_count(&self) -> f64 {
        self.weight
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// `sum_sq_dev / max(effective_count - 1, 1)`
    pub fn variance(&self) -> f64 {
        (self.sum_sq_dev / (self.weight - 1.0).max(1.0)).max(0.0)
    }

    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// `(x - mean) / (std + epsilon)`
    pub fn normalized(&self, x: f64) -> f64 {
        (x - self.mean) / (self.std() + self.epsilon)
    }

    /// Combine with statistics gathered independently (Chan et al.).
    ///
    /// Only meaningful for undiscounted statistics, where the result is the
    /// same as feeding both sample streams into one accumulator.
    pub fn merge(&mut self, other: &RunningStatistics) {
        if other.weight == 0.0 {
            return;
        }
        if self.weight == 0.0 {
            self.count = other.count;
            self.weight = other.weight;
            self.mean = other.mean;
            self.sum_sq_dev = other.sum_sq_dev;
            return;
        }

        let total = self.weight + other.weight;
        let delta = other.mean - self.mean;
        self.mean += delta * other.weight / total;
        self.sum_sq_dev += other.sum_sq_dev + delta * delta * self.weight * other.weight / total;
        self.weight = total;
        self.count += other.count;
    }
}

/// Per-dimension running statistics of state vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNormalizer {
    dims: Vec<RunningStatistics>,
}

impl StateNormalizer {
    pub fn new(dim: usize) -> Self {
        Self {
            dims: vec![RunningStatistics::new(); dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.dims.len()
    }

    /// Statistics of dimension `i`
    pub fn dimension(&self, i: usize) -> Option<&RunningStatistics> {
        self.dims.get(i)
    }

    /// Fold one state vector into the statistics (undiscounted).
    pub fn observe(&mut self, state: &[f32]) -> Result<()> {
        self.check(state)?;
        for (stats, &x) in self.dims.iter_mut().zip(state) {
            stats.add_raw_value(x as f64, 1.0)?;
        }
        Ok(())
    }

    /// Normalize each dimension with its own statistics.
    pub fn normalize(&self, state: &[f32]) -> Result<Vec<f32>> {
        self.check(state)?;
        Ok(self
            .dims
            .iter()
            .zip(state)
            .map(|(stats, &x)| stats.normalized(x as f64) as f32)
            .collect())
    }

    fn check(&self, state: &[f32]) -> Result<()> {
        if state.len() != self.dims.len() {
            return Err(Error::DimensionMismatch {
                what: "state normalizer",
                expected: self.dims.len(),
                actual: state.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn batch_mean_var(xs: &[f64]) -> (f64, f64) {
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);
        (mean, var)
    }

    fn feed(xs: &[f64]) -> RunningStatistics {
        let mut stats = RunningStatistics::new();
        for &x in xs {
            stats.add_raw_value(x, 1.0).unwrap();
        }
        stats
    }

    #[test]
    fn matches_batch_statistics() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0, -3.5, 1e3];
        let stats = feed(&xs);
        let (mean, var) = batch_mean_var(&xs);

        assert_eq!(stats.count(), xs.len() as u64);
        assert_relative_eq!(stats.mean(), mean, epsilon = 1e-9);
        assert_relative_eq!(stats.variance(), var, epsilon = 1e-7);
    }

    #[test]
    fn independent_of_feed_order() {
        let xs = [0.3, -1.2, 8.0, 2.5, 2.5, -0.7, 4.4];
        let mut reversed = xs;
        reversed.reverse();
        let mut shuffled = xs;
        shuffled.swap(0, 5);
        shuffled.swap(2, 3);

        let a = feed(&xs);
        for other in [feed(&reversed), feed(&shuffled)] {
            assert_relative_eq!(a.mean(), other.mean(), epsilon = 1e-12);
            assert_relative_eq!(a.variance(), other.variance(), epsilon = 1e-10);
        }
    }

    #[test]
    fn first_sample_has_zero_variance() {
        let stats = feed(&[3.0]);
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.variance(), 0.0);
        // (x - mean) / (0 + eps) stays finite
        assert_eq!(stats.normalized(3.0), 0.0);
        assert!(stats.normalized(4.0).is_finite());
    }

    #[test]
    fn constant_signal_normalizes_to_zero() {
        let stats = feed(&[1.5; 50]);
        assert_relative_eq!(stats.variance(), 0.0, epsilon = 1e-15);
        assert_relative_eq!(stats.normalized(1.5), 0.0);
    }

    #[test]
    fn normalized_has_unit_scale() {
        let xs: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin() * 5.0 + 2.0).collect();
        let stats = feed(&xs);
        let normalized: Vec<f64> = xs.iter().map(|&x| stats.normalized(x)).collect();
        let (mean, var) = batch_mean_var(&normalized);
        assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
        assert_relative_eq!(var, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn discount_emphasizes_recent_samples() {
        let mut stats = RunningStatistics::new();
        for _ in 0..500 {
            stats.add_raw_value(0.0, 0.9).unwrap();
        }
        for _ in 0..100 {
            stats.add_raw_value(10.0, 0.9).unwrap();
        }
        // weight saturates at 1 / (1 - 0.9)
        assert_relative_eq!(stats.effective_count(), 10.0, epsilon = 1e-3);
        assert!(stats.mean() > 9.9);
        assert_eq!(stats.count(), 600);
    }

    #[test]
    fn invalid_discount_is_rejected() {
        let mut stats = RunningStatistics::new();
        for d in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(stats.add_raw_value(1.0, d), Err(Error::InvalidDiscount(_))));
        }
        assert_eq!(stats.count(), 0);
    }

    #[test]
    fn merge_equals_sequential() {
        let xs = [1.0, 2.0, 3.5, -4.0, 10.0];
        let ys = [0.5, 0.25, 7.0];
        let mut a = feed(&xs);
        a.merge(&feed(&ys));
        let all: Vec<f64> = xs.iter().chain(ys.iter()).copied().collect();
        let b = feed(&all);

        assert_eq!(a.count(), b.count());
        assert_relative_eq!(a.mean(), b.mean(), epsilon = 1e-12);
        assert_relative_eq!(a.variance(), b.variance(), epsilon = 1e-10);

        let mut empty = RunningStatistics::new();
        empty.merge(&b);
        assert_eq!(empty, b);
    }

    #[test]
    fn state_normalizer_is_per_dimension() {
        let mut norm = StateNormalizer::new(2);
        for i in 0..10 {
            norm.observe(&[i as f32, 100.0 + 10.0 * i as f32]).unwrap();
        }
        let out = norm.normalize(&[4.5, 145.0]).unwrap();
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(out[1], 0.0, epsilon = 1e-6);
        assert_relative_eq!(norm.dimension(1).unwrap().mean(), 145.0, epsilon = 1e-9);
    }

    #[test]
    fn state_normalizer_checks_dimension() {
        let mut norm = StateNormalizer::new(3);
        assert!(matches!(
            norm.observe(&[1.0, 2.0]),
            Err(Error::DimensionMismatch { expected: 3, actual: 2, .. })
        ));
        assert!(norm.normalize(&[1.0; 4]).is_err());
    }
}
