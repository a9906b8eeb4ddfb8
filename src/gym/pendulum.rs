use rand::{thread_rng, Rng};
use std::f32::consts::PI;

use crate::env::{Environment, Step};

const MAX_SPEED: f32 = 8.0;
pub const MAX_TORQUE: f32 = 2.0;
const DT: f32 = 0.05;
const G: f32 = 10.0;
const M: f32 = 1.0;
const L: f32 = 1.0;

/// Per-step diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumInfo {
    /// Torque actually applied after clamping
    pub torque: f32,
    /// Angle from upright, in [-π, π)
    pub theta: f32,
    /// `done` came from the step limit rather than a terminal state
    pub truncated: bool,
}

/// Classic Pendulum environment with continuous action space
///
/// The goal is to keep the pendulum upright by applying torque.
/// The state is represented as [cos(θ), sin(θ), angular_velocity] to avoid
/// discontinuity issues with angle wrapping.
///
/// # Physics
/// - Mass: 1.0 kg
/// - Length: 1.0 m
/// - Gravity: 10.0 m/s²
/// - Time step: 0.05 s
/// - Max angular velocity: 8.0 rad/s
/// - Max torque: 2.0 N⋅m
///
/// # Reward
/// r = -θ² - 0.1⋅θ̇² - 0.001⋅u²
///
/// The pendulum never falls into a terminal state; `done` is reported once
/// `max_steps` steps have been taken since the last reset, with
/// `info.truncated` set. The training loop does not read `info`, so it
/// bootstraps such a step with 0 like any other terminal step.
#[derive(Debug, Clone)]
pub struct Pendulum {
    theta: f32,
    theta_dot: f32,
    steps: usize,
    max_steps: usize,
}

impl Pendulum {
    /// Create a new Pendulum environment
    ///
    /// # Arguments
    /// * `max_steps` - Maximum number of steps per episode (typically 200)
    pub fn new(max_steps: usize) -> Self {
        Self {
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
            max_steps,
        }
    }

    fn get_state(&self) -> Vec<f32> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }

    fn angle_normalize(x: f32) -> f32 {
        (x + PI).rem_euclid(2.0 * PI) - PI
    }
}

impl Environment for Pendulum {
    type Info = PendulumInfo;

    fn observation_size(&self) -> usize {
        3
    }

    fn action_size(&self) -> usize {
        1
    }

    fn reset(&mut self) -> Vec<f32> {
        let mut rng = thread_rng();
        self.theta = rng.gen_range(-PI..PI);
        self.theta_dot = rng.gen_range(-1.0..1.0);
        self.steps = 0;
        self.get_state()
    }

    fn step(&mut self, action: &[f32]) -> Step<PendulumInfo> {
        let torque = action
            .first()
            .copied()
            .unwrap_or_default()
            .clamp(-MAX_TORQUE, MAX_TORQUE);

        // Reward of the state the torque is applied in
        let reward = -(self.theta.powi(2) + 0.1 * self.theta_dot.powi(2) + 0.001 * torque.powi(2));

        // Physics: θ̈ = (3g/2L)sin(θ) + (3/mL²)u
        let theta_acc = (3.0 * G / (2.0 * L)) * self.theta.sin() + (3.0 / (M * L * L)) * torque;

        self.theta_dot = (self.theta_dot + theta_acc * DT).clamp(-MAX_SPEED, MAX_SPEED);
        self.theta = Self::angle_normalize(self.theta + self.theta_dot * DT);
        self.steps += 1;
        let truncated = self.steps >= self.max_steps;

        Step {
            state: self.get_state(),
            reward,
            done: truncated,
            info: PendulumInfo {
                torque,
                theta: self.theta,
                truncated,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pendulum_physics() {
        let mut env = Pendulum::new(200);

        let state = env.reset();
        assert_eq!(state.len(), env.observation_size());
        assert!(state[0].abs() <= 1.0, "cos(θ) should be in [-1, 1]");
        assert!(state[1].abs() <= 1.0, "sin(θ) should be in [-1, 1]");
        assert!(state[2].abs() <= MAX_SPEED, "Angular velocity should be bounded");

        let step = env.step(&[0.0]);
        assert!(!step.done, "Should not be terminal after one step");

        // Should be clamped to MAX_TORQUE
        let high = env.step(&[100.0]);
        let low = env.step(&[-100.0]);
        assert_eq!(high.info.torque, MAX_TORQUE);
        assert_eq!(low.info.torque, -MAX_TORQUE);
        assert!(high.reward.is_finite() && low.reward.is_finite());
    }

    #[test]
    fn pendulum_reward() {
        let mut env = Pendulum::new(200);
        env.theta = 0.0;
        env.theta_dot = 0.0;
        let upright = env.step(&[0.0]);
        assert_eq!(upright.reward, 0.0);

        env.theta = PI - 0.01;
        env.theta_dot = 0.0;
        let down = env.step(&[0.0]);
        assert!(down.reward < upright.reward, "Reward should be lower when pendulum is down");
    }

    #[test]
    fn pendulum_angle_stays_wrapped() {
        let mut env = Pendulum::new(1000);
        env.reset();
        for _ in 0..500 {
            let step = env.step(&[MAX_TORQUE]);
            assert!(step.info.theta.abs() <= PI + 1e-5);
        }
    }

    #[test]
    fn pendulum_episode_length() {
        let mut env = Pendulum::new(5);
        env.reset();

        for i in 0..5 {
            let step = env.step(&[0.0]);
            assert_eq!(step.done, i == 4, "terminal exactly at max_steps");
            assert_eq!(step.info.truncated, step.done);
        }

        env.reset();
        assert!(!env.step(&[0.0]).done, "reset restarts the step budget");
    }
}
