//! Learning-rate annealing, advanced once per completed episode.
//!
//! The rate decays linearly from its initial value to zero over the
//! configured number of episodes:
//!
//! ```text
//! lr(k) = lr_0 * max(0, 1 - k / total_episodes)
//! ```
//!
//! where `k` is the number of completed episodes. With 10 episodes and
//! `lr_0 = 1e-3`, the rate after episode 5 is `5e-4`.

/// Linear annealing schedule of one approximator.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningRateSchedule {
    initial_lr: f64,
    total_episodes: usize,
    enabled: bool,
    completed: usize,
    /// Index of the last episode the schedule advanced for
    last_episode: Option<usize>,
}

impl LearningRateSchedule {
    /// Linear decay over `total_episodes`
    pub fn linear(initial_lr: f64, total_episodes: usize) -> Self {
        Self {
            initial_lr,
            total_episodes,
            enabled: true,
            completed: 0,
            last_episode: None,
        }
    }

    /// Schedule that always returns `lr`
    pub fn constant(lr: f64) -> Self {
        Self {
            enabled: false,
            ..Self::linear(lr, 0)
        }
    }

    /// Linear when `anneal` is set, constant otherwise
    pub fn new(initial_lr: f64, total_episodes: usize, anneal: bool) -> Self {
        if anneal {
            Self::linear(initial_lr, total_episodes)
        } else {
            Self::constant(initial_lr)
        }
    }

    pub fn lr(&self) -> f64 {
        if !self.enabled || self.total_episodes == 0 {
            return self.initial_lr;
        }
        let progress = self.completed as f64 / self.total_episodes as f64;
        self.initial_lr * (1.0 - progress).max(0.0)
    }

    pub fn initial_lr(&self) -> f64 {
        self.initial_lr
    }

    /// Episodes the schedule has advanced for
    pub fn completed_episodes(&self) -> usize {
        self.completed
    }

    /// Record the end of `episode`.
    ///
    /// Returns whether the schedule moved. Calls for an episode at or before
    /// the last recorded one are ignored, so the rate changes at most once
    /// per episode however often this is called.
    pub fn advance(&mut self, episode: usize) -> bool {
        if !self.enabled {
            return false;
        }
        if self.last_episode.is_some_and(|last| episode <= last) {
            return false;
        }
        self.last_episode = Some(episode);
        self.completed += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_midpoint() {
        let mut schedule = LearningRateSchedule::linear(1e-3, 10);
        assert_eq!(schedule.lr(), 1e-3);
        for episode in 0..5 {
            assert!(schedule.advance(episode));
        }
        assert_relative_eq!(schedule.lr(), 5e-4, epsilon = 1e-15);
    }

    #[test]
    fn reaches_zero_and_stays() {
        let mut schedule = LearningRateSchedule::linear(1e-3, 4);
        for episode in 0..6 {
            schedule.advance(episode);
        }
        assert_eq!(schedule.lr(), 0.0);
    }

    #[test]
    fn at_most_once_per_episode() {
        let mut schedule = LearningRateSchedule::linear(1e-3, 10);
        assert!(schedule.advance(0));
        for _ in 0..50 {
            assert!(!schedule.advance(0));
        }
        assert_eq!(schedule.completed_episodes(), 1);
        assert_relative_eq!(schedule.lr(), 9e-4, epsilon = 1e-15);
        // stale episode indices are ignored as well
        assert!(schedule.advance(1));
        assert!(!schedule.advance(0));
        assert_eq!(schedule.completed_episodes(), 2);
    }

    #[test]
    fn disabled_schedule_is_constant() {
        let mut schedule = LearningRateSchedule::new(3e-4, 10, false);
        for episode in 0..20 {
            assert!(!schedule.advance(episode));
        }
        assert_eq!(schedule.lr(), 3e-4);
        assert_eq!(schedule.completed_episodes(), 0);
    }
}
