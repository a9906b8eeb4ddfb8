//! Fixed-capacity rollout window.
//!
//! Storage is allocated once per run and reused: every window overwrites the
//! slots of the previous one. Columns are kept separately so the reward and
//! value columns can be handed to the advantage estimator without copying.

use crate::error::{Error, Result};

/// One environment step as seen by the learner
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub value_estimate: f32,
}

#[derive(Debug, Clone)]
pub struct RolloutWindow {
    state_dim: usize,
    action_dim: usize,
    /// `[capacity * state_dim]`, row-major
    states: Vec<f32>,
    /// `[capacity * action_dim]`, row-major
    actions: Vec<f32>,
    rewards: Vec<f32>,
    values: Vec<f32>,
    len: usize,
}

impl RolloutWindow {
    pub fn new(capacity: usize, state_dim: usize, action_dim: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "rollout window capacity must be positive".into(),
            ));
        }
        Ok(Self {
            state_dim,
            action_dim,
            states: vec![0.0; capacity * state_dim],
            actions: vec![0.0; capacity * action_dim],
            rewards: vec![0.0; capacity],
            values: vec![0.0; capacity],
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.rewards.len()
    }

    /// Number of slots written since the last reset
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Write the transition of `step_index` into slot `step_index % capacity`.
    ///
    /// Each slot is written exactly once between resets, in order.
    pub fn write(&mut self, step_index: usize, transition: Transition) -> Result<usize> {
        let capacity = self.capacity();
        if self.is_full() {
            return Err(Error::WindowOverflow { capacity });
        }
        let slot = step_index % capacity;
        if slot != self.len {
            return Err(Error::WindowSlot {
                slot,
                next: self.len,
            });
        }
        if transition.state.len() != self.state_dim {
            return Err(Error::DimensionMismatch {
                what: "state",
                expected: self.state_dim,
                actual: transition.state.len(),
            });
        }
        if transition.action.len() != self.action_dim {
            return Err(Error::DimensionMismatch {
                what: "action",
                expected: self.action_dim,
                actual: transition.action.len(),
            });
        }

        let s = slot * self.state_dim;
        self.states[s..s + self.state_dim].copy_from_slice(&transition.state);
        let a = slot * self.action_dim;
        self.actions[a..a + self.action_dim].copy_from_slice(&transition.action);
        self.rewards[slot] = transition.reward;
        self.values[slot] = transition.value_estimate;
        self.len += 1;
        Ok(slot)
    }

    /// Logically empty the window; slot contents are left for overwriting
    pub fn reset(&mut self) {
        self.len = 0;
    }

    /// Rewards of the filled prefix
    pub fn rewards(&self) -> &[f32] {
        &self.rewards[..self.len]
    }

    /// Value estimates of the filled prefix
    pub fn values(&self) -> &[f32] {
        &self.values[..self.len]
    }

    /// States of the filled prefix, flattened `[len * state_dim]`
    pub fn states(&self) -> &[f32] {
        &self.states[..self.len * self.state_dim]
    }

    /// Actions of the filled prefix, flattened `[len * action_dim]`
    pub fn actions(&self) -> &[f32] {
        &self.actions[..self.len * self.action_dim]
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn get(&self, slot: usize) -> Option<Transition> {
        if slot >= self.len {
            return None;
        }
        let s = slot * self.state_dim;
        let a = slot * self.action_dim;
        Some(Transition {
            state: self.states[s..s + self.state_dim].to_vec(),
            action: self.actions[a..a + self.action_dim].to_vec(),
            reward: self.rewards[slot],
            value_estimate: self.values[slot],
        })
    }
}
