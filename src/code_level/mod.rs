//! Code-level optimizations: training-stabilization tricks that sit beside
//! the core algorithm and are toggled one by one from
//! [`CodeLevelConfig`](crate::config::CodeLevelConfig).

pub mod clipping;
pub mod grad_clip;
pub mod running_stats;
pub mod schedule;

pub use clipping::{
    clip_reward, clip_state, normalize_reward, normalize_state, preprocess_reward,
    preprocess_state,
};
pub use grad_clip::{clip_gradient, global_norm, GradientGroup, ParamSlot, ParameterSlots};
pub use running_stats::{RunningStatistics, StateNormalizer};
pub use schedule::LearningRateSchedule;
