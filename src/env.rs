//! Environment contract and per-episode reports.
//!
//! The trainer only needs a reset/step pair plus the two space sizes, which
//! are queried once when the agent is built.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// Outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<I> {
    /// Observation after the action was applied
    pub state: Vec<f32>,
    /// Raw reward, before any clipping or normalization
    pub reward: f32,
    /// Whether the environment reached a terminal state
    pub done: bool,
    /// Environment-specific diagnostics, ignored by the trainer
    pub info: I,
}

/// A simulation environment with continuous states and actions.
///
/// # Example
///
/// ```rust,ignore
/// use rl_trainer::env::{Environment, Step};
///
/// struct Constant;
///
/// impl Environment for Constant {
///     type Info = ();
///
///     fn observation_size(&self) -> usize { 1 }
///     fn action_size(&self) -> usize { 1 }
///     fn reset(&mut self) -> Vec<f32> { vec![0.0] }
///     fn step(&mut self, _action: &[f32]) -> Step<()> {
///         Step { state: vec![0.0], reward: 1.0, done: false, info: () }
///     }
/// }
/// ```
pub trait Environment {
    /// Extra information returned with every step
    type Info;

    /// Length of every state vector
    fn observation_size(&self) -> usize;

    /// Length of every action vector
    fn action_size(&self) -> usize;

    /// Start a new trajectory and return the initial state
    fn reset(&mut self) -> Vec<f32>;

    /// Apply an action and advance the simulation by one step
    fn step(&mut self, action: &[f32]) -> Step<Self::Info>;
}

/// Named scalar values collected over an episode.
///
/// Derefs to the underlying map so callers can use `entry`, `get` and
/// friends directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report(BTreeMap<String, f64>);

impl Report {
    /// Create a report with every key initialised to zero
    pub fn new(keys: Vec<&str>) -> Self {
        Self(keys.into_iter().map(|k| (k.to_string(), 0.0)).collect())
    }

    /// Set a value, inserting the key if needed
    pub fn set(&mut self, key: &str, value: f64) {
        self.0.insert(key.to_string(), value);
    }

    /// Value for `key`, zero when absent
    pub fn value(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or_default()
    }
}

impl Deref for Report {
    type Target = BTreeMap<String, f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Report {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
