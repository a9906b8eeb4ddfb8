//! Error type shared by the whole crate.

use thiserror::Error;

/// Errors raised by configuration, the advantage estimator, the rollout window
/// and the training loop.
///
/// Numerical degeneracy (zero variance, zero gradient norm) is not an error:
/// it is absorbed by epsilon terms where it occurs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("value sequence must be one longer than reward sequence (values: {values}, rewards: {rewards})")]
    LengthMismatch { values: usize, rewards: usize },

    #[error("{what} dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("discount must be finite and in (0, 1], got {0}")]
    InvalidDiscount(f64),

    #[error("rollout window is full (capacity {capacity})")]
    WindowOverflow { capacity: usize },

    #[error("rollout slot {slot} written out of order, next free slot is {next}")]
    WindowSlot { slot: usize, next: usize },

    #[error("the {0} is unavailable after a failed update")]
    Poisoned(&'static str),

    #[error("tensor data: {0}")]
    Tensor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
