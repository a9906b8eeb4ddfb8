//! State and reward clipping/normalization.
//!
//! Every function takes the [`CodeLevelConfig`] and returns its input
//! unchanged when the matching flag is off. The `preprocess_*` functions
//! compose clipping and normalization in the order configured for each
//! signal; the statistics are fed with whatever value enters the normalize
//! stage.

use crate::code_level::running_stats::{RunningStatistics, StateNormalizer};
use crate::config::{ClipOrder, CodeLevelConfig};
use crate::error::Result;

/// Element-wise clamp to `[-state_clip_bound, state_clip_bound]`.
pub fn clip_state(cfg: &CodeLevelConfig, state: Vec<f32>) -> Vec<f32> {
    if !cfg.state_clip {
        return state;
    }
    let c = cfg.state_clip_bound;
    state.into_iter().map(|x| x.clamp(-c, c)).collect()
}

/// Clamp to `[-reward_clip_bound, reward_clip_bound]`.
pub fn clip_reward(cfg: &CodeLevelConfig, reward: f32) -> f32 {
    if !cfg.reward_clip {
        return reward;
    }
    let c = cfg.reward_clip_bound;
    reward.clamp(-c, c)
}

pub fn normalize_state(
    cfg: &CodeLevelConfig,
    normalizer: &StateNormalizer,
    state: Vec<f32>,
) -> Result<Vec<f32>> {
    if !cfg.state_normalize {
        return Ok(state);
    }
    normalizer.normalize(&state)
}

pub fn normalize_reward(cfg: &CodeLevelConfig, stats: &RunningStatistics, reward: f32) -> f32 {
    if !cfg.reward_normalize {
        return reward;
    }
    stats.normalized(reward as f64) as f32
}

/// Clip and normalize a raw state in the configured order.
///
/// The normalizer only accumulates when state normalization is enabled.
pub fn preprocess_state(
    cfg: &CodeLevelConfig,
    normalizer: &mut StateNormalizer,
    state: Vec<f32>,
) -> Result<Vec<f32>> {
    match cfg.state_order {
        ClipOrder::ClipThenNormalize => {
            let clipped = clip_state(cfg, state);
            if cfg.state_normalize {
                normalizer.observe(&clipped)?;
            }
            normalize_state(cfg, normalizer, clipped)
        }
        ClipOrder::NormalizeThenClip => {
            if cfg.state_normalize {
                normalizer.observe(&state)?;
            }
            let normalized = normalize_state(cfg, normalizer, state)?;
            Ok(clip_state(cfg, normalized))
        }
    }
}

/// Clip and normalize a raw reward in the configured order.
///
/// `stats` is fed on every call, with `gamma` as discount, so the reward
/// scale estimate covers the whole run even while normalization is off.
pub fn preprocess_reward(
    cfg: &CodeLevelConfig,
    stats: &mut RunningStatistics,
    reward: f32,
    gamma: f32,
) -> Result<f32> {
    match cfg.reward_order {
        ClipOrder::NormalizeThenClip => {
            stats.add_raw_value(reward as f64, gamma as f64)?;
            let normalized = normalize_reward(cfg, stats, reward);
            Ok(clip_reward(cfg, normalized))
        }
        ClipOrder::ClipThenNormalize => {
            let clipped = clip_reward(cfg, reward);
            stats.add_raw_value(clipped as f64, gamma as f64)?;
            Ok(normalize_reward(cfg, stats, clipped))
        }
    }
}
