//! Actor-critic training loop
//!
//! The agent drives one environment through episodes and alternates between
//! two phases:
//!
//! - **Collecting**: the state is preprocessed (clip/normalize), the actor
//!   samples an action, the critic scores the `(state, action)` pair, the
//!   environment steps and the preprocessed transition is written into the
//!   rollout window.
//! - **Updating**: entered when the window is full or when the environment
//!   terminates before the first window since the last reset has filled.
//!   A later partial window cut short by termination is discarded. GAE turns
//!   the filled prefix
//!   into returns and standardized advantages, both losses are
//!   back-propagated, the joint gradient norm is clipped and both optimizers
//!   step.
//!
//! At every completed **episode boundary** the learning-rate schedules advance
//! exactly once; an episode cut short by the stop flag does not move them. Running statistics live as long as the agent and are never reset.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
//! use rl_trainer::{algo::ActorCriticAgent, config::TrainingConfig, gym::Pendulum};
//!
//! type Backend = Autodiff<NdArray>;
//!
//! let config = TrainingConfig::load("configs/pendulum.yaml")?;
//! let mut env = Pendulum::new(config.max_episode_steps);
//! let mut agent = ActorCriticAgent::<Backend, _, _>::from_config(
//!     config,
//!     env.observation_size(),
//!     env.action_size(),
//!     NdArrayDevice::default(),
//! )?;
//! let reports = agent.run(&mut env)?;
//! ```

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use burn::{
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, AdamW, AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use tracing::{debug, info, warn};

use crate::algo::gae::AdvantageEstimator;
use crate::algo::rollout::{RolloutWindow, Transition};
use crate::code_level::{
    clip_gradient, preprocess_reward, preprocess_state, GradientGroup, LearningRateSchedule,
    ParameterSlots, RunningStatistics, StateNormalizer,
};
use crate::config::TrainingConfig;
use crate::env::{Environment, Report};
use crate::error::{Error, Result};
use crate::nn::{Actor, ActorConfig, Critic, CriticConfig};
use crate::traits::{Rows, StepOutcome, ToTensor, TrainableAgent, TrainingMetrics};

/// Policy network contract
pub trait ActorModel<B: AutodiffBackend>: AutodiffModule<B> + ParameterSlots {
    /// Deterministic action, `[batch, state]` → `[batch, action]`
    fn mean(&self, states: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Exploratory action drawn from the policy
    fn sample(&self, states: Tensor<B, 2>) -> Tensor<B, 2>;

    /// `log π(a|s)` per row, `[batch]`
    fn log_prob(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1>;

    /// Policy entropy, `[1]`
    fn entropy(&self) -> Tensor<B, 1>;
}

/// Value network contract
pub trait CriticModel<B: AutodiffBackend>: AutodiffModule<B> + ParameterSlots {
    /// `V(s, a)` per row, `[batch]`
    fn value(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Where the training loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Updating,
    EpisodeBoundary,
}

/// Keys of the per-episode [`Report`]
pub const REPORT_KEYS: [&str; 12] = [
    "reward",
    "steps",
    "updates",
    "actor_updates",
    "critic_updates",
    "terminations",
    "policy_loss",
    "value_loss",
    "entropy",
    "grad_norm",
    "actor_lr",
    "critic_lr",
];

/// Actor-critic agent over continuous actions
///
/// Generic over:
/// - `B`: Autodiff backend (e.g., NdArray, Wgpu)
/// - `A`: Actor network implementing [`ActorModel`]
/// - `C`: Critic network implementing [`CriticModel`]
pub struct ActorCriticAgent<B, A, C>
where
    B: AutodiffBackend,
    A: ActorModel<B>,
    C: CriticModel<B>,
{
    // Networks (Option for ownership during optimization)
    actor: Option<A>,
    critic: Option<C>,

    optimizer_actor: OptimizerAdaptor<AdamW, A, B>,
    optimizer_critic: OptimizerAdaptor<AdamW, C, B>,
    actor_schedule: LearningRateSchedule,
    critic_schedule: LearningRateSchedule,

    // Run-wide statistics, never reset
    reward_stats: RunningStatistics,
    state_normalizer: StateNormalizer,

    window: RolloutWindow,
    estimator: AdvantageEstimator,
    config: TrainingConfig,
    device: B::Device,
    obs_dim: usize,
    act_dim: usize,

    // Preprocessed state the next action is taken from
    current_state: Option<Vec<f32>>,
    // Steps since the environment was last reset
    step_index: usize,
    episode: usize,
    phase: Phase,
    total_steps: usize,
    learn_mode: bool,
    stop: Option<Arc<AtomicBool>>,
}

impl<B, A, C> ActorCriticAgent<B, A, C>
where
    B: AutodiffBackend,
    A: ActorModel<B>,
    C: CriticModel<B>,
{
    /// Create an agent around already built networks.
    ///
    /// Fails when the configuration is invalid or a space is empty.
    pub fn new(
        actor: A,
        critic: C,
        config: TrainingConfig,
        observation_size: usize,
        action_size: usize,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;
        if observation_size == 0 || action_size == 0 {
            return Err(Error::InvalidConfig(format!(
                "observation and action sizes must be positive, got {observation_size} and {action_size}"
            )));
        }

        let optimizer_actor = adamw(&config).init();
        let optimizer_critic = adamw(&config).init();

        let anneal = config.code_level_opt.lr_anneal;
        let actor_schedule = LearningRateSchedule::new(config.actor.lr, config.actor.n_epochs, anneal);
        let critic_schedule =
            LearningRateSchedule::new(config.critic.lr, config.critic.n_epochs, anneal);

        Ok(Self {
            actor: Some(actor),
            critic: Some(critic),
            optimizer_actor,
            optimizer_critic,
            actor_schedule,
            critic_schedule,
            reward_stats: RunningStatistics::new(),
            state_normalizer: StateNormalizer::new(observation_size),
            window: RolloutWindow::new(config.timesteps_per_iteration, observation_size, action_size)?,
            estimator: AdvantageEstimator::new(config.discount, config.gae_lambda)?,
            config,
            device,
            obs_dim: observation_size,
            act_dim: action_size,
            current_state: None,
            step_index: 0,
            episode: 0,
            phase: Phase::EpisodeBoundary,
            total_steps: 0,
            learn_mode: true,
            stop: None,
        })
    }

    /// Stop the loop at the next step boundary once `flag` is set
    pub fn with_stop_signal(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn actor(&self) -> Option<&A> {
        self.actor.as_ref()
    }

    pub fn critic(&self) -> Option<&C> {
        self.critic.as_ref()
    }

    pub fn reward_statistics(&self) -> &RunningStatistics {
        &self.reward_stats
    }

    pub fn state_normalizer(&self) -> &StateNormalizer {
        &self.state_normalizer
    }

    pub fn actor_schedule(&self) -> &LearningRateSchedule {
        &self.actor_schedule
    }

    pub fn critic_schedule(&self) -> &LearningRateSchedule {
        &self.critic_schedule
    }

    /// Transitions waiting in the current window
    pub fn pending_transitions(&self) -> usize {
        self.window.len()
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Train for `max(actor.n_epochs, critic.n_epochs)` episodes.
    ///
    /// Returns one report per finished episode; fewer when stopped early.
    pub fn run<E: Environment>(&mut self, env: &mut E) -> Result<Vec<Report>> {
        let n_episodes = self.config.n_episodes();
        let mut reports = Vec::with_capacity(n_episodes);
        for episode in 0..n_episodes {
            if self.stop_requested() {
                info!(episode, "stop requested, ending training");
                break;
            }
            let report = self.run_episode(env, episode)?;
            info!(
                episode,
                reward = report.value("reward"),
                steps = report.value("steps"),
                updates = report.value("updates"),
                actor_lr = report.value("actor_lr"),
                critic_lr = report.value("critic_lr"),
                "episode finished"
            );
            reports.push(report);
        }
        Ok(reports)
    }

    /// Run one episode with index `episode`.
    ///
    /// The index decides which approximators are still trained and keys the
    /// schedules, which advance at most once per index.
    pub fn run_episode<E: Environment>(&mut self, env: &mut E, episode: usize) -> Result<Report> {
        self.episode = episode;
        TrainableAgent::<E>::reset_episode(self);

        let mut report = Report::new(REPORT_KEYS.to_vec());
        report.set("actor_lr", self.actor_schedule.lr());
        report.set("critic_lr", self.critic_schedule.lr());

        let mut totals = EpisodeTotals::default();
        let mut interrupted = false;
        for _ in 0..self.config.max_episode_steps {
            if self.stop_requested() {
                debug!(episode, "stop requested mid-episode");
                interrupted = true;
                break;
            }
            let outcome = self.step(env)?;
            totals.record(&outcome);
            if outcome.done && self.config.stop_on_done {
                break;
            }
        }

        self.discard_window("episode ended");
        self.end_episode(episode, !interrupted);

        totals.fill(&mut report);
        Ok(report)
    }

    fn end_episode(&mut self, episode: usize, completed: bool) {
        self.window.reset();
        self.current_state = None;
        if completed {
            self.actor_schedule.advance(episode);
            self.critic_schedule.advance(episode);
        }
        self.phase = Phase::EpisodeBoundary;
    }

    /// Reset the environment and start a fresh window
    fn begin_trajectory<E: Environment>(&mut self, env: &mut E) -> Result<Vec<f32>> {
        let raw = env.reset();
        check_dim("state", self.obs_dim, raw.len())?;
        self.discard_window("environment reset");
        self.step_index = 0;
        preprocess_state(&self.config.code_level_opt, &mut self.state_normalizer, raw)
    }

    fn discard_window(&mut self, reason: &'static str) {
        if !self.window.is_empty() && self.learn_mode {
            warn!(
                episode = self.episode,
                discarded = self.window.len(),
                reason,
                "partial window discarded"
            );
        }
        self.window.reset();
    }

    /// Sampled (or, in evaluation mode, mean) action and its value estimate
    fn act(&self, state: &[f32]) -> Result<(Vec<f32>, f32)> {
        let actor = self.actor.as_ref().ok_or(Error::Poisoned("actor"))?;
        let critic = self.critic.as_ref().ok_or(Error::Poisoned("critic"))?;

        let states: Tensor<B, 2> = vec![state.to_vec()].to_tensor(&self.device);
        let action = if self.learn_mode {
            actor.sample(states.clone())
        } else {
            actor.mean(states.clone())
        };
        let value = critic.value(states, action.clone());

        let action = tensor_to_vec(action)?;
        check_dim("action", self.act_dim, action.len())?;
        Ok((action, scalar(value)))
    }

    /// `V(s', μ(s'))` for an unfinished trajectory
    fn bootstrap_value(&self, next_state: &[f32]) -> Result<f32> {
        let actor = self.actor.as_ref().ok_or(Error::Poisoned("actor"))?;
        let critic = self.critic.as_ref().ok_or(Error::Poisoned("critic"))?;

        let states: Tensor<B, 2> = vec![next_state.to_vec()].to_tensor(&self.device);
        let action = actor.mean(states.clone());
        Ok(scalar(critic.value(states, action)))
    }

    /// One gradient step of both approximators on the filled window
    fn update(&mut self, next_state: &[f32], done: bool) -> Result<TrainingMetrics> {
        let n = self.window.len();
        if n == 0 {
            return Ok(TrainingMetrics::default());
        }
        self.phase = Phase::Updating;

        let bootstrap = if done {
            0.0
        } else {
            self.bootstrap_value(next_state)?
        };
        let mut values = Vec::with_capacity(n + 1);
        values.extend_from_slice(self.window.values());
        values.push(bootstrap);
        let trajectory = self.estimator.estimate(&values, self.window.rewards())?;

        let states: Tensor<B, 2> =
            Rows::new(self.window.states().to_vec(), self.obs_dim).to_tensor(&self.device);
        let actions: Tensor<B, 2> =
            Rows::new(self.window.actions().to_vec(), self.act_dim).to_tensor(&self.device);
        let advantages: Tensor<B, 1> = trajectory.advantages.to_tensor(&self.device);
        let returns: Tensor<B, 1> = trajectory.returns.to_tensor(&self.device);

        let actor = self.actor.take().ok_or(Error::Poisoned("actor"))?;
        let critic = self.critic.take().ok_or(Error::Poisoned("critic"))?;

        let entropy = actor.entropy();
        let policy_loss = (actor.log_prob(states.clone(), actions.clone()) * advantages)
            .mean()
            .neg()
            - entropy.clone().mul_scalar(self.config.entropy_coef);
        let value_loss = (returns - critic.value(states, actions))
            .powf_scalar(2.0)
            .mean()
            .mul_scalar(self.config.value_coef);

        let mut metrics = TrainingMetrics {
            policy_loss: scalar(policy_loss.clone()),
            value_loss: scalar(value_loss.clone()),
            entropy: scalar(entropy),
            window_len: n,
            actor_lr: self.actor_schedule.lr(),
            critic_lr: self.critic_schedule.lr(),
            actor_updated: self.episode < self.config.actor.n_epochs,
            critic_updated: self.episode < self.config.critic.n_epochs,
            ..Default::default()
        };

        let mut actor_grads = if metrics.actor_updated {
            GradientsParams::from_grads(policy_loss.backward(), &actor)
        } else {
            GradientsParams::default()
        };
        let mut critic_grads = if metrics.critic_updated {
            GradientsParams::from_grads(value_loss.backward(), &critic)
        } else {
            GradientsParams::default()
        };

        metrics.grad_norm = {
            let mut groups = Vec::with_capacity(2);
            if metrics.actor_updated {
                groups.push(GradientGroup::new(&actor, &mut actor_grads));
            }
            if metrics.critic_updated {
                groups.push(GradientGroup::new(&critic, &mut critic_grads));
            }
            clip_gradient::<B>(&self.config.code_level_opt, &mut groups)
        };

        self.actor = Some(if metrics.actor_updated {
            self.optimizer_actor.step(metrics.actor_lr, actor, actor_grads)
        } else {
            actor
        });
        self.critic = Some(if metrics.critic_updated {
            self.optimizer_critic.step(metrics.critic_lr, critic, critic_grads)
        } else {
            critic
        });

        self.window.reset();
        self.phase = Phase::Collecting;

        debug!(
            window = n,
            done,
            policy_loss = metrics.policy_loss,
            value_loss = metrics.value_loss,
            grad_norm = metrics.grad_norm,
            "update"
        );
        Ok(metrics)
    }
}

impl<B: AutodiffBackend> ActorCriticAgent<B, Actor<B>, Critic<B>> {
    /// Build the Gaussian actor and the critic from the configuration.
    ///
    /// Seeds the backend RNG first when a seed is configured.
    pub fn from_config(
        config: TrainingConfig,
        observation_size: usize,
        action_size: usize,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(seed) = config.seed {
            B::seed(seed);
        }

        let c = &config.code_level_opt;
        let actor = ActorConfig::new(observation_size, action_size, config.actor.hidden_layers.clone())
            .with_activation(c.activation)
            .with_orthogonal_init(c.orthogonal_init)
            .init(&device);
        let critic =
            CriticConfig::new(observation_size, action_size, config.critic.hidden_layers.clone())
                .with_activation(c.activation)
                .with_orthogonal_init(c.orthogonal_init)
                .init(&device);

        Self::new(actor, critic, config, observation_size, action_size, device)
    }
}

impl<B, A, C, E> TrainableAgent<E> for ActorCriticAgent<B, A, C>
where
    B: AutodiffBackend,
    A: ActorModel<B>,
    C: CriticModel<B>,
    E: Environment,
{
    fn step(&mut self, env: &mut E) -> Result<StepOutcome> {
        let state = match self.current_state.take() {
            Some(state) => state,
            None => self.begin_trajectory(env)?,
        };
        self.phase = Phase::Collecting;

        let (action, value_estimate) = self.act(&state)?;
        let step = env.step(&action);
        check_dim("state", self.obs_dim, step.state.len())?;

        let cfg = &self.config.code_level_opt;
        let reward = preprocess_reward(cfg, &mut self.reward_stats, step.reward, self.config.discount)?;
        // index of this step since the last reset
        let index = self.step_index;
        self.window.write(
            index,
            Transition {
                state,
                action,
                reward,
                value_estimate,
            },
        )?;
        self.step_index += 1;
        self.total_steps += 1;
        let next_state = preprocess_state(cfg, &mut self.state_normalizer, step.state)?;

        let done_in_first_window = step.done && index < self.window.capacity();
        let learn = TrainableAgent::<E>::should_learn(self) || (done_in_first_window && self.learn_mode);
        let metrics = if learn {
            Some(self.update(&next_state, step.done)?)
        } else {
            if self.window.is_full() || done_in_first_window {
                self.window.reset();
            }
            None
        };

        // a terminal state is followed by a reset on the next step
        self.current_state = (!step.done).then_some(next_state);

        Ok(StepOutcome {
            reward: step.reward,
            done: step.done,
            metrics,
        })
    }

    fn should_learn(&self) -> bool {
        self.learn_mode && self.window.is_full()
    }

    fn learn(&mut self, next_state: &[f32], done: bool) -> Result<TrainingMetrics> {
        check_dim("state", self.obs_dim, next_state.len())?;
        self.update(next_state, done)
    }

    fn reset_episode(&mut self) {
        self.window.reset();
        self.current_state = None;
        self.step_index = 0;
    }

    fn total_steps(&self) -> usize {
        self.total_steps
    }

    fn eval(&mut self) {
        self.learn_mode = false;
    }

    fn train(&mut self) {
        self.learn_mode = true;
    }
}

/// Running sums of one episode
#[derive(Default)]
struct EpisodeTotals {
    reward: f64,
    steps: usize,
    terminations: usize,
    updates: usize,
    actor_updates: usize,
    critic_updates: usize,
    policy_loss: f64,
    value_loss: f64,
    entropy: f64,
    grad_norm: f64,
}

impl EpisodeTotals {
    fn record(&mut self, outcome: &StepOutcome) {
        self.reward += outcome.reward as f64;
        self.steps += 1;
        if outcome.done {
            self.terminations += 1;
        }
        if let Some(m) = &outcome.metrics {
            self.updates += 1;
            self.actor_updates += m.actor_updated as usize;
            self.critic_updates += m.critic_updated as usize;
            self.policy_loss += m.policy_loss as f64;
            self.value_loss += m.value_loss as f64;
            self.entropy += m.entropy as f64;
            self.grad_norm += m.grad_norm as f64;
        }
    }

    /// Losses are averaged over the episode's updates
    fn fill(&self, report: &mut Report) {
        let per_update = |x: f64| if self.updates > 0 { x / self.updates as f64 } else { 0.0 };
        report.set("reward", self.reward);
        report.set("steps", self.steps as f64);
        report.set("terminations", self.terminations as f64);
        report.set("updates", self.updates as f64);
        report.set("actor_updates", self.actor_updates as f64);
        report.set("critic_updates", self.critic_updates as f64);
        report.set("policy_loss", per_update(self.policy_loss));
        report.set("value_loss", per_update(self.value_loss));
        report.set("entropy", per_update(self.entropy));
        report.set("grad_norm", per_update(self.grad_norm));
    }
}

fn adamw(config: &TrainingConfig) -> AdamWConfig {
    AdamWConfig::new()
        .with_beta_1(0.9)
        .with_beta_2(0.999)
        .with_weight_decay(config.weight_decay)
}

fn check_dim(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}

fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| Error::Tensor(format!("{e:?}")))
}

// ============================================================================
// Network implementations
// ============================================================================

impl<B: AutodiffBackend> ActorModel<B> for Actor<B> {
    fn mean(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        Actor::forward(self, states)
    }

    fn sample(&self, states: Tensor<B, 2>) -> Tensor<B, 2> {
        Actor::sample(self, states)
    }

    fn log_prob(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1> {
        Actor::log_prob(self, states, actions)
    }

    fn entropy(&self) -> Tensor<B, 1> {
        Actor::entropy(self)
    }
}

impl<B: AutodiffBackend> CriticModel<B> for Critic<B> {
    fn value(&self, states: Tensor<B, 2>, actions: Tensor<B, 2>) -> Tensor<B, 1> {
        Critic::value(self, states, actions)
    }
}
