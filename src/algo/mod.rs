/// Actor-critic training loop
pub mod actor_critic;

/// Generalized Advantage Estimation
pub mod gae;

/// Fixed-capacity rollout storage
pub mod rollout;

pub use actor_critic::{ActorCriticAgent, ActorModel, CriticModel, Phase};
pub use gae::{AdvantageEstimator, AdvantageTrajectory};
pub use rollout::{RolloutWindow, Transition};
