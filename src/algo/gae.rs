//! Generalized Advantage Estimation (GAE)
//!
//! Given the value estimates `V[0..=T]` of a finished window (the last entry
//! is the bootstrap value of the state after the window) and its rewards
//! `R[0..T]`, the estimator runs one backward pass:
//!
//! ```text
//! delta[i]   = R[i] + gamma * V[i+1] - V[i]
//! gae        = delta[i] + gamma * lambda * gae      // gae starts at 0
//! returns[i] = gae + V[i]
//! ```
//!
//! `lambda = 0` yields the one-step TD error, `lambda = 1` the Monte-Carlo
//! advantage.

use crate::error::{Error, Result};

/// Added to the standard deviation when standardizing advantages
pub const ADVANTAGE_EPSILON: f64 = 1e-8;

/// Returns and advantages of one window, index-aligned with its transitions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdvantageTrajectory {
    /// Regression targets of the critic
    pub returns: Vec<f32>,
    /// Policy-gradient weights (standardized unless produced by `estimate_raw`)
    pub advantages: Vec<f32>,
}

impl AdvantageTrajectory {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvantageEstimator {
    gamma: f64,
    lambda: f64,
}

impl AdvantageEstimator {
    pub fn new(gamma: f32, lambda: f32) -> Result<Self> {
        for (name, v) in [("discount", gamma), ("gae_lambda", lambda)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        Ok(Self {
            gamma: gamma as f64,
            lambda: lambda as f64,
        })
    }

    pub fn gamma(&self) -> f32 {
        self.gamma as f32
    }

    pub fn lambda(&self) -> f32 {
        self.lambda as f32
    }

    /// Returns and unstandardized advantages `returns[i] - V[i]`.
    ///
    /// Fails unless `values.len() == rewards.len() + 1`.
    pub fn estimate_raw(&self, values: &[f32], rewards: &[f32]) -> Result<AdvantageTrajectory> {
        if values.len() != rewards.len() + 1 {
            return Err(Error::LengthMismatch {
                values: values.len(),
                rewards: rewards.len(),
            });
        }

        let n = rewards.len();
        let mut returns = vec![0.0_f32; n];
        let mut advantages = vec![0.0_f32; n];
        let mut gae = 0.0_f64;
        for i in (0..n).rev() {
            let v = values[i] as f64;
            let delta = rewards[i] as f64 + self.gamma * values[i + 1] as f64 - v;
            gae = delta + self.gamma * self.lambda * gae;
            returns[i] = (gae + v) as f32;
            advantages[i] = gae as f32;
        }

        Ok(AdvantageTrajectory {
            returns,
            advantages,
        })
    }

    /// Returns and advantages standardized over the whole window
    pub fn estimate(&self, values: &[f32], rewards: &[f32]) -> Result<AdvantageTrajectory> {
        let mut trajectory = self.estimate_raw(values, rewards)?;
        standardize(&mut trajectory.advantages);
        Ok(trajectory)
    }
}

/// In-place `(x - mean) / (std + 1e-8)` with the population std.
///
/// A constant sequence becomes all zeros.
pub fn standardize(xs: &mut [f32]) {
    if xs.is_empty() {
        return;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = xs.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;
    let denom = var.sqrt() + ADVANTAGE_EPSILON;
    for x in xs.iter_mut() {
        *x = ((*x as f64 - mean) / denom) as f32;
    }
}
