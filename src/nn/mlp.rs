//! Multi-Layer Perceptron (MLP) - feedforward stack shared by the actor and
//! the critic.
//!
//! Layer widths come from configuration. Hidden layers are followed by the
//! configured activation, the output layer is linear.

use burn::{
    module::{Module, Param},
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};
use serde::{Deserialize, Serialize};

use crate::code_level::{ParamSlot, ParameterSlots};
use crate::nn::orthogonal::{generate_orthogonal_weights, HIDDEN_GAIN};

/// Nonlinearity applied after every hidden layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
}

/// Configuration for Multi-Layer Perceptron
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [64, 64] for two hidden layers of 64 units each)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
    /// Activation between hidden layers (default: ReLU)
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
    /// Orthogonal weights and zero biases instead of burn's default init
    #[config(default = "false")]
    pub orthogonal_init: bool,
    /// Orthogonal gain of the output layer; hidden layers always use sqrt(2),
    /// tanh stacks included
    #[config(default = "1.0")]
    pub output_gain: f64,
}

/// Multi-Layer Perceptron implementation
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    layers: Vec<Linear<B>>,
    use_tanh: bool,
}

impl MLPConfig {
    /// Initialize the MLP with the given configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        let mut widths = Vec::with_capacity(self.hidden_layers.len() + 2);
        widths.push(self.input_dim);
        widths.extend_from_slice(&self.hidden_layers);
        widths.push(self.output_dim);

        let n_layers = widths.len() - 1;
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let layer = LinearConfig::new(pair[0], pair[1]).init(device);
                if !self.orthogonal_init {
                    return layer;
                }
                let gain = if i + 1 == n_layers {
                    self.output_gain
                } else {
                    HIDDEN_GAIN
                };
                orthogonal_linear(layer, pair[0], pair[1], gain, device)
            })
            .collect();

        MLP {
            layers,
            use_tanh: self.activation == Activation::Tanh,
        }
    }
}

/// Replace a layer's weights with orthogonal ones and zero its bias.
///
/// burn stores `Linear` weights as `[d_input, d_output]`.
fn orthogonal_linear<B: Backend>(
    mut layer: Linear<B>,
    d_input: usize,
    d_output: usize,
    gain: f64,
    device: &B::Device,
) -> Linear<B> {
    layer.weight = Param::from_tensor(generate_orthogonal_weights(d_input, d_output, gain, device));
    if layer.bias.is_some() {
        layer.bias = Some(Param::from_tensor(Tensor::zeros([d_output], device)));
    }
    layer
}

impl<B: Backend> MLP<B> {
    /// Forward pass over any tensor rank; the last dimension holds the features.
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let (last, hidden) = match self.layers.split_last() {
            Some(split) => split,
            None => return input,
        };

        let mut x = input;
        for layer in hidden {
            x = layer.forward(x);
            x = if self.use_tanh { x.tanh() } else { relu(x) };
        }
        last.forward(x)
    }

    /// Number of linear layers, output layer included
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Weight matrix of layer `i`, `[d_input, d_output]`
    pub fn layer_weight(&self, i: usize) -> Option<Tensor<B, 2>> {
        self.layers.get(i).map(|l| l.weight.val())
    }
}

impl<B: Backend> ParameterSlots for MLP<B> {
    fn parameter_slots(&self) -> Vec<ParamSlot> {
        let mut slots = Vec::with_capacity(self.layers.len() * 2);
        for layer in &self.layers {
            slots.push(ParamSlot::Matrix(layer.weight.id.clone()));
            if let Some(bias) = &layer.bias {
                slots.push(ParamSlot::Vector(bias.id.clone()));
            }
        }
        slots
    }
}
