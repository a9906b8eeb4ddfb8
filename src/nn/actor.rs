//! Policy network: a diagonal Gaussian over continuous actions.
//!
//! The MLP maps a state to the action means; a learnable, state-independent
//! `log_std` vector sets the exploration noise.

use burn::{
    module::{Module, Param},
    prelude::*,
    tensor::{backend::Backend, Distribution},
};

use crate::code_level::{ParamSlot, ParameterSlots};
use crate::nn::mlp::{Activation, MLPConfig, MLP};

/// ln(2π) / 2
const HALF_LOG_TWO_PI: f32 = 0.918_938_5;

/// Configuration for the policy network
#[derive(Config, Debug)]
pub struct ActorConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    pub hidden_layers: Vec<usize>,
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
    #[config(default = "false")]
    pub orthogonal_init: bool,
    /// Small gain so the initial action means stay near zero
    #[config(default = "0.01")]
    pub output_gain: f64,
    /// Initial log standard deviation of every action dimension
    #[config(default = "0.0")]
    pub init_log_std: f32,
}

#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    mlp: MLP<B>,
    log_std: Param<Tensor<B, 1>>,
}

impl ActorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Actor<B> {
        let mlp = MLPConfig::new(self.state_dim, self.hidden_layers.clone(), self.action_dim)
            .with_activation(self.activation)
            .with_orthogonal_init(self.orthogonal_init)
            .with_output_gain(self.output_gain)
            .init(device);
        let log_std = Tensor::full([self.action_dim], self.init_log_std, device);

        Actor {
            mlp,
            log_std: Param::from_tensor(log_std),
        }
    }
}

impl<B: Backend> Actor<B> {
    /// Action means, `[batch, state_dim]` → `[batch, action_dim]`
    pub fn forward(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(states)
    }

    /// Per-dimension standard deviation, `[action_dim]`
    pub fn std(&self) -> Tensor<B, 1> {
        self.log_std.val().exp()
    }

    /// Draw actions `mean + std * N(0, 1)` for a batch of states
    pub fn sample(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        let mean = self.forward(states);
        let noise = Tensor::random(mean.shape(), Distribution::Normal(0.0, 1.0), &mean.device());
        mean + noise * self.std().unsqueeze_dim::<2>(0)
    }

    /// Log-density of `actions` under the policy at `states`, `[batch]`
    pub fn log_prob(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1> {
        let mean = self.forward(states);
        let log_std = self.log_std.val().unsqueeze_dim::<2>(0);
        let z = (actions - mean) / log_std.clone().exp();
        let per_dim = z.powf_scalar(2.0).mul_scalar(-0.5) - log_std;
        let per_dim = per_dim.sub_scalar(HALF_LOG_TWO_PI);
        per_dim.sum_dim(1).squeeze_dims(&[1])
    }

    /// Entropy of the Gaussian, identical for every state, `[1]`
    pub fn entropy(&self) -> Tensor<B, 1> {
        let action_dim = self.log_std.val().dims()[0] as f32;
        self.log_std
            .val()
            .sum()
            .add_scalar(action_dim * (0.5 + HALF_LOG_TWO_PI))
    }

    pub fn action_dim(&self) -> usize {
        self.log_std.val().dims()[0]
    }
}

impl<B: Backend> ParameterSlots for Actor<B> {
    fn parameter_slots(&self) -> Vec<ParamSlot> {
        let mut slots = self.mlp.parameter_slots();
        slots.push(ParamSlot::Vector(self.log_std.id.clone()));
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    fn actor(log_std: f32) -> Actor<NdArray> {
        ActorConfig::new(3, 2, vec![16])
            .with_init_log_std(log_std)
            .init(&NdArrayDevice::default())
    }

    #[test]
    fn shapes() {
        let device = NdArrayDevice::default();
        let actor = actor(0.0);
        let states = Tensor::<NdArray, 2>::random([5, 3], Distribution::Default, &device);
        assert_eq!(actor.forward(states.clone()).dims(), [5, 2]);
        assert_eq!(actor.sample(states.clone()).dims(), [5, 2]);
        let actions = Tensor::<NdArray, 2>::zeros([5, 2], &device);
        assert_eq!(actor.log_prob(states, actions).dims(), [5]);
        assert_eq!(actor.action_dim(), 2);
    }

    #[test]
    fn log_prob_at_mean_is_gaussian_peak() {
        let device = NdArrayDevice::default();
        let log_std = -0.5_f32;
        let actor = actor(log_std);
        let states = Tensor::<NdArray, 2>::random([4, 3], Distribution::Default, &device);
        let means = actor.forward(states.clone());
        let log_prob = actor.log_prob(states, means).into_data();

        let expected = 2.0 * (-log_std - HALF_LOG_TWO_PI);
        for &lp in log_prob.as_slice::<f32>().unwrap() {
            assert!((lp - expected).abs() < 1e-5, "{lp} vs {expected}");
        }
    }

    #[test]
    fn entropy_matches_closed_form() {
        let actor = actor(0.25);
        let entropy: f32 = actor.entropy().into_scalar().elem();
        let expected = 2.0 * (0.5 + HALF_LOG_TWO_PI + 0.25);
        assert!((entropy - expected).abs() < 1e-5);
    }

    #[test]
    fn orthogonal_policy_head_starts_near_zero() {
        let device = NdArrayDevice::default();
        let actor = ActorConfig::new(4, 2, vec![32, 32])
            .with_orthogonal_init(true)
            .init::<NdArray>(&device);
        let states = Tensor::<NdArray, 2>::random([16, 4], Distribution::Uniform(-1.0, 1.0), &device);
        let max: f32 = actor.forward(states).abs().max().into_scalar().elem();
        assert!(max < 0.5, "initial means should be small, got {max}");
    }

    #[test]
    fn slots_include_log_std() {
        let actor = actor(0.0);
        // two linear layers with biases plus log_std
        assert_eq!(actor.parameter_slots().len(), 5);
    }
}
