//! Training configuration.
//!
//! Loaded from YAML, validated once, then handed to the agent. Every
//! code-level optimization lives in [`CodeLevelConfig`] as a flag plus its
//! parameters so any combination can be switched on independently.
//!
//! ```yaml
//! discount: 0.99
//! gae_lambda: 0.95
//! timesteps_per_iteration: 2048
//! actor:
//!   hidden_layers: [64, 64]
//!   n_epochs: 100
//!   lr: 3.0e-4
//! critic:
//!   hidden_layers: [64, 64]
//!   n_epochs: 100
//!   lr: 1.0e-3
//! code_level_opt:
//!   reward_normalize: true
//!   reward_clip: true
//!   reward_clip_bound: 10.0
//!   orthogonal_init: true
//!   gradient_clip: true
//!   gradient_clip_norm: 0.5
//!   lr_anneal: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::nn::Activation;

/// Order in which clipping and normalization are applied to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipOrder {
    /// Clamp the raw value, then normalize the clamped value
    ClipThenNormalize,
    /// Normalize the raw value, then clamp the normalized value
    NormalizeThenClip,
}

/// Per-approximator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximatorConfig {
    /// Widths of the hidden layers, input to output
    pub hidden_layers: Vec<usize>,
    /// Number of episodes during which this approximator is trained.
    /// Also the annealing horizon of its learning rate.
    pub n_epochs: usize,
    /// Initial learning rate
    pub lr: f64,
}

/// The bundle of code-level optimizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeLevelConfig {
    pub state_clip: bool,
    pub state_clip_bound: f32,
    pub reward_clip: bool,
    pub reward_clip_bound: f32,
    pub state_normalize: bool,
    pub reward_normalize: bool,
    pub orthogonal_init: bool,
    pub gradient_clip: bool,
    pub gradient_clip_norm: f32,
    pub lr_anneal: bool,
    pub state_order: ClipOrder,
    pub reward_order: ClipOrder,
    pub activation: Activation,
}

impl Default for CodeLevelConfig {
    fn default() -> Self {
        Self {
            state_clip: false,
            state_clip_bound: 10.0,
            reward_clip: false,
            reward_clip_bound: 10.0,
            state_normalize: false,
            reward_normalize: false,
            orthogonal_init: false,
            gradient_clip: false,
            gradient_clip_norm: 0.5,
            lr_anneal: false,
            state_order: ClipOrder::ClipThenNormalize,
            reward_order: ClipOrder::NormalizeThenClip,
            activation: Activation::Relu,
        }
    }
}

impl CodeLevelConfig {
    /// Every optimization enabled with default bounds
    pub fn all_enabled() -> Self {
        Self {
            state_clip: true,
            reward_clip: true,
            state_normalize: true,
            reward_normalize: true,
            orthogonal_init: true,
            gradient_clip: true,
            lr_anneal: true,
            ..Self::default()
        }
    }
}

fn default_max_episode_steps() -> usize {
    10_240
}

fn default_true() -> bool {
    true
}

fn default_value_coef() -> f32 {
    0.5
}

fn default_weight_decay() -> f32 {
    1e-3
}

fn default_env() -> String {
    "Pendulum".to_string()
}

/// Top-level training configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Discount factor γ
    pub discount: f32,
    /// GAE λ
    pub gae_lambda: f32,
    /// Rollout window size
    pub timesteps_per_iteration: usize,
    /// Step budget of one episode
    #[serde(default = "default_max_episode_steps")]
    pub max_episode_steps: usize,
    /// End the episode as soon as the environment reports a terminal state.
    /// When false the environment is reset in place and the episode runs
    /// until its step budget.
    #[serde(default = "default_true")]
    pub stop_on_done: bool,
    /// Entropy bonus coefficient of the actor loss
    #[serde(default)]
    pub entropy_coef: f32,
    /// Weight of the critic regression loss
    #[serde(default = "default_value_coef")]
    pub value_coef: f32,
    /// AdamW weight decay of both optimizers
    #[serde(default = "default_weight_decay")]
    pub weight_decay: f32,
    /// Backend RNG seed
    #[serde(default)]
    pub seed: Option<u64>,
    /// Environment name, only read by the binary
    #[serde(default = "default_env")]
    pub env: String,
    pub actor: ApproximatorConfig,
    pub critic: ApproximatorConfig,
    #[serde(default)]
    pub code_level_opt: CodeLevelConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            discount: 0.99,
            gae_lambda: 0.95,
            timesteps_per_iteration: 2048,
            max_episode_steps: default_max_episode_steps(),
            stop_on_done: true,
            entropy_coef: 0.0,
            value_coef: default_value_coef(),
            weight_decay: default_weight_decay(),
            seed: None,
            env: default_env(),
            actor: ApproximatorConfig {
                hidden_layers: vec![64, 64],
                n_epochs: 100,
                lr: 3e-4,
            },
            critic: ApproximatorConfig {
                hidden_layers: vec![64, 64],
                n_epochs: 100,
                lr: 1e-3,
            },
            code_level_opt: CodeLevelConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Number of episodes of the run: the longer of the two training horizons
    pub fn n_episodes(&self) -> usize {
        self.actor.n_epochs.max(self.critic.n_epochs)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        unit_interval("discount", self.discount)?;
        if self.discount == 0.0 {
            return invalid("discount must be positive");
        }
        unit_interval("gae_lambda", self.gae_lambda)?;
        if self.timesteps_per_iteration == 0 {
            return invalid("timesteps_per_iteration must be positive");
        }
        if self.max_episode_steps == 0 {
            return invalid("max_episode_steps must be positive");
        }
        non_negative("entropy_coef", self.entropy_coef)?;
        non_negative("value_coef", self.value_coef)?;
        non_negative("weight_decay", self.weight_decay)?;
        approximator("actor", &self.actor)?;
        approximator("critic", &self.critic)?;
        if self.n_episodes() == 0 {
            return invalid("at least one of actor.n_epochs and critic.n_epochs must be positive");
        }

        let c = &self.code_level_opt;
        if c.state_clip {
            positive("code_level_opt.state_clip_bound", c.state_clip_bound)?;
        }
        if c.reward_clip {
            positive("code_level_opt.reward_clip_bound", c.reward_clip_bound)?;
        }
        if c.gradient_clip {
            positive("code_level_opt.gradient_clip_norm", c.gradient_clip_norm)?;
        }
        Ok(())
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T> {
    Err(Error::InvalidConfig(msg.into()))
}

fn unit_interval(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return invalid(format!("{name} must be in [0, 1], got {value}"));
    }
    Ok(())
}

fn non_negative(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return invalid(format!("{name} must be finite and non-negative, got {value}"));
    }
    Ok(())
}

fn positive(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return invalid(format!("{name} must be finite and positive, got {value}"));
    }
    Ok(())
}

fn approximator(name: &str, config: &ApproximatorConfig) -> Result<()> {
    if config.hidden_layers.iter().any(|&w| w == 0) {
        return invalid(format!("{name}.hidden_layers must not contain zero widths"));
    }
    if !config.lr.is_finite() || config.lr <= 0.0 {
        return invalid(format!("{name}.lr must be finite and positive, got {}", config.lr));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
discount: 0.99
gae_lambda: 0.95
timesteps_per_iteration: 16
actor:
  hidden_layers: [8]
  n_epochs: 3
  lr: 1.0e-3
critic:
  hidden_layers: [8, 8]
  n_epochs: 5
  lr: 1.0e-3
"#;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let config = TrainingConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.timesteps_per_iteration, 16);
        assert_eq!(config.max_episode_steps, 10_240);
        assert!(config.stop_on_done);
        assert_eq!(config.code_level_opt, CodeLevelConfig::default());
        assert_eq!(config.n_episodes(), 5);
        assert_eq!(config.env, "Pendulum");
    }

    #[test]
    fn code_level_section_is_parsed() {
        let yaml = format!(
            "{MINIMAL}code_level_opt:\n  reward_clip: true\n  reward_clip_bound: 5.0\n  state_order: normalize_then_clip\n  activation: tanh\n"
        );
        let config = TrainingConfig::from_yaml_str(&yaml).unwrap();
        let c = &config.code_level_opt;
        assert!(c.reward_clip);
        assert_eq!(c.reward_clip_bound, 5.0);
        assert_eq!(c.state_order, ClipOrder::NormalizeThenClip);
        assert_eq!(c.reward_order, ClipOrder::NormalizeThenClip);
        assert_eq!(c.activation, Activation::Tanh);
        assert!(!c.gradient_clip);
    }

    #[test]
    fn missing_required_key_fails() {
        let yaml = "discount: 0.99\ngae_lambda: 0.95\n";
        assert!(matches!(TrainingConfig::from_yaml_str(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn non_numeric_bound_fails() {
        let yaml = format!("{MINIMAL}code_level_opt:\n  state_clip_bound: wide\n");
        assert!(matches!(TrainingConfig::from_yaml_str(&yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn negative_window_fails() {
        let yaml = MINIMAL.replace("timesteps_per_iteration: 16", "timesteps_per_iteration: -4");
        assert!(TrainingConfig::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = TrainingConfig::default();
        config.timesteps_per_iteration = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn enabled_clip_needs_positive_bound() {
        let mut config = TrainingConfig::default();
        config.code_level_opt.gradient_clip = true;
        config.code_level_opt.gradient_clip_norm = 0.0;
        assert!(config.validate().is_err());

        // bounds of disabled toggles are not checked
        config.code_level_opt.gradient_clip = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn discount_out_of_range_is_rejected() {
        let mut config = TrainingConfig::default();
        config.discount = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn shipped_pendulum_config_is_valid() {
        let config = TrainingConfig::from_yaml_str(include_str!("../configs/pendulum.yaml")).unwrap();
        assert_eq!(config.env, "Pendulum");
        assert_eq!(config.seed, Some(42));
        assert!(config.code_level_opt.orthogonal_init);
    }

    #[test]
    fn zero_discount_is_rejected() {
        let mut config = TrainingConfig::default();
        config.discount = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn all_enabled_validates() {
        let mut config = TrainingConfig::default();
        config.code_level_opt = CodeLevelConfig::all_enabled();
        assert!(config.validate().is_ok());
    }
}
