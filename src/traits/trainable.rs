//! Trainable agent trait for fine-grained training control
//!
//! Lets a caller drive the agent one environment step at a time instead of
//! handing it whole episodes, while still getting the metrics of every
//! update.

use crate::env::Environment;
use crate::error::Result;

/// Training metrics returned after each training update
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingMetrics {
    /// Policy-gradient loss, entropy bonus included
    pub policy_loss: f32,

    /// Weighted value regression loss
    pub value_loss: f32,

    /// Entropy of the policy (higher means more exploration)
    pub entropy: f32,

    /// Joint gradient norm of actor and critic, measured before clipping
    pub grad_norm: f32,

    /// Number of transitions the update consumed
    pub window_len: usize,

    /// Learning rates used for this update
    pub actor_lr: f64,
    pub critic_lr: f64,

    /// Whether each approximator was stepped
    pub actor_updated: bool,
    pub critic_updated: bool,
}

/// Result of one environment step taken by an agent
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutcome {
    /// Raw environment reward
    pub reward: f32,
    pub done: bool,
    /// Present when the step closed a window and triggered an update
    pub metrics: Option<TrainingMetrics>,
}

/// Trait for trainable RL agents with fine-grained control
///
/// # Example
///
/// ```ignore
/// let outcome = agent.step(&mut env)?;
/// if let Some(metrics) = outcome.metrics {
///     println!("Policy loss: {}", metrics.policy_loss);
/// }
/// ```
pub trait TrainableAgent<E: Environment> {
    /// Take one step in the environment.
    ///
    /// Updates the approximators itself when the step fills the window or
    /// ends the trajectory.
    fn step(&mut self, env: &mut E) -> Result<StepOutcome>;

    /// Whether the collected window is ready for an update.
    ///
    /// Always false in evaluation mode.
    fn should_learn(&self) -> bool;

    /// Update on the collected window.
    ///
    /// `next_state` is the preprocessed state following the last transition,
    /// used to bootstrap the value of an unfinished trajectory.
    fn learn(&mut self, next_state: &[f32], done: bool) -> Result<TrainingMetrics>;

    /// Drop the current window and trajectory, keep learned weights and
    /// running statistics
    fn reset_episode(&mut self);

    /// Get total number of environment steps taken
    fn total_steps(&self) -> usize;

    // Make agent in evaluation mode
    fn eval(&mut self);

    // Make agent in training mode
    fn train(&mut self);
}
