//! Actor-critic training core with toggleable code-level optimizations.
//!
//! - [`code_level`]: running statistics, clipping, gradient clipping and
//!   learning-rate annealing
//! - [`algo`]: GAE, the rollout window and the training loop
//! - [`nn`]: actor and critic networks with orthogonal initialization
//! - [`env`], [`gym`]: the environment contract and a Pendulum environment

pub mod algo;
pub mod code_level;
pub mod config;
pub mod env;
pub mod error;
pub mod gym;
pub mod nn;
pub mod traits;

pub use error::{Error, Result};
