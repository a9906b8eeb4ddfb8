//! Global gradient-norm clipping across several modules.
//!
//! burn's optimizer-level clipping works tensor by tensor. The actor and the
//! critic have separate optimizers, yet their gradients must be clipped by
//! one shared norm, so the gradients of both are gathered here by parameter
//! id, measured together and rescaled in place before either optimizer
//! steps.

use burn::{module::ParamId, optim::GradientsParams, prelude::*, tensor::backend::AutodiffBackend};

use crate::config::CodeLevelConfig;

/// Added to the norm before dividing by it.
const NORM_EPSILON: f32 = 1e-6;

/// A float parameter of a module, by rank.
#[derive(Debug, Clone)]
pub enum ParamSlot {
    Vector(ParamId),
    Matrix(ParamId),
}

/// Modules that can list their trainable float parameters.
pub trait ParameterSlots {
    fn parameter_slots(&self) -> Vec<ParamSlot>;
}

/// Gradients of one module together with the slots they belong to.
pub struct GradientGroup<'a> {
    pub slots: Vec<ParamSlot>,
    pub grads: &'a mut GradientsParams,
}

impl<'a> GradientGroup<'a> {
    pub fn new<M: ParameterSlots>(module: &M, grads: &'a mut GradientsParams) -> Self {
        Self {
            slots: module.parameter_slots(),
            grads,
        }
    }
}

/// L2 norm of the concatenation of every gradient in every group.
///
/// Parameters without a gradient contribute nothing.
pub fn global_norm<B: AutodiffBackend>(groups: &[GradientGroup<'_>]) -> f32 {
    let mut sum_sq = 0.0_f32;
    for group in groups {
        for slot in &group.slots {
            sum_sq += match slot {
                ParamSlot::Vector(id) => squared_sum::<B::InnerBackend, 1>(group.grads, id.clone()),
                ParamSlot::Matrix(id) => squared_sum::<B::InnerBackend, 2>(group.grads, id.clone()),
            };
        }
    }
    sum_sq.sqrt()
}

/// Clip the joint gradient norm of all groups to `gradient_clip_norm`.
///
/// Returns the norm measured before clipping. Gradients are left untouched
/// when clipping is disabled or the norm is already within bounds.
pub fn clip_gradient<B: AutodiffBackend>(
    cfg: &CodeLevelConfig,
    groups: &mut [GradientGroup<'_>],
) -> f32 {
    let norm = global_norm::<B>(groups);
    if !cfg.gradient_clip || norm <= cfg.gradient_clip_norm {
        return norm;
    }

    let scale = cfg.gradient_clip_norm / (norm + NORM_EPSILON);
    for group in groups.iter_mut() {
        for slot in &group.slots {
            match slot {
                ParamSlot::Vector(id) => rescale::<B::InnerBackend, 1>(group.grads, id.clone(), scale),
                ParamSlot::Matrix(id) => rescale::<B::InnerBackend, 2>(group.grads, id.clone(), scale),
            }
        }
    }
    norm
}

fn squared_sum<B: Backend, const D: usize>(grads: &GradientsParams, id: ParamId) -> f32 {
    grads
        .get::<B, D>(id)
        .map(|g| g.powf_scalar(2.0).sum().into_scalar().elem::<f32>())
        .unwrap_or(0.0)
}

fn rescale<B: Backend, const D: usize>(grads: &mut GradientsParams, id: ParamId, scale: f32) {
    if let Some(g) = grads.remove::<B, D>(id.clone()) {
        grads.register::<B, D>(id, g.mul_scalar(scale));
    }
}
