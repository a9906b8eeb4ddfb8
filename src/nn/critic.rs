//! Value network over state/action pairs.
//!
//! The input is the concatenation `[state ‖ action]`; the output is one
//! unconstrained scalar per row.

use burn::{module::Module, prelude::*, tensor::backend::Backend};

use crate::code_level::{ParamSlot, ParameterSlots};
use crate::nn::mlp::{Activation, MLPConfig, MLP};

#[derive(Config, Debug)]
pub struct CriticConfig {
    pub state_dim: usize,
    pub action_dim: usize,
    pub hidden_layers: Vec<usize>,
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
    #[config(default = "false")]
    pub orthogonal_init: bool,
    #[config(default = "1.0")]
    pub output_gain: f64,
}

#[derive(Module, Debug)]
pub struct Critic<B: Backend> {
    mlp: MLP<B>,
}

impl CriticConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Critic<B> {
        let mlp = MLPConfig::new(self.state_dim + self.action_dim, self.hidden_layers.clone(), 1)
            .with_activation(self.activation)
            .with_orthogonal_init(self.orthogonal_init)
            .with_output_gain(self.output_gain)
            .init(device);
        Critic { mlp }
    }
}

impl<B: Backend> Critic<B> {
    /// `[batch, state_dim]`, `[batch, action_dim]` → `[batch, 1]`
    pub fn forward(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        self.mlp.forward(Tensor::cat(vec![states, actions], 1))
    }

    /// Values as a flat `[batch]` tensor
    pub fn value(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1> {
        self.forward(states, actions).squeeze_dims(&[1])
    }
}

impl<B: Backend> ParameterSlots for Critic<B> {
    fn parameter_slots(&self) -> Vec<ParamSlot> {
        self.mlp.parameter_slots()
    }
}
