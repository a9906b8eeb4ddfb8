//! Function approximators for the actor and the critic

pub mod actor;
pub mod critic;
pub mod mlp;
pub mod orthogonal;

pub use actor::{Actor, ActorConfig};
pub use critic::{Critic, CriticConfig};
pub use mlp::{Activation, MLPConfig, MLP};
pub use orthogonal::generate_orthogonal_weights;
