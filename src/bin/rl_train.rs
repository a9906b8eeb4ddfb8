//! Train the actor-critic agent on a built-in environment.
//!
//! ```text
//! RUST_LOG=debug rl-train --config configs/pendulum.yaml --episodes 50
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::backend::Autodiff;
use clap::Parser;
use once_cell::sync::Lazy;
use rl_trainer::{algo::ActorCriticAgent, config::TrainingConfig, env::Environment, gym::Pendulum};
use tracing_subscriber::EnvFilter;

#[cfg(not(feature = "wgpu"))]
type Inner = burn::backend::NdArray;
#[cfg(feature = "wgpu")]
type Inner = burn::backend::Wgpu;

type TrainBackend = Autodiff<Inner>;

static DEVICE: Lazy<<Inner as burn::prelude::Backend>::Device> = Lazy::new(Default::default);

#[derive(Parser, Debug)]
#[command(name = "rl-train")]
#[command(about = "Actor-critic training with code-level optimizations")]
struct Args {
    /// YAML training configuration
    #[arg(long)]
    config: PathBuf,

    /// Override the number of episodes of both approximators
    #[arg(long)]
    episodes: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = TrainingConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(episodes) = args.episodes {
        config.actor.n_epochs = episodes;
        config.critic.n_epochs = episodes;
        config.validate()?;
    }

    let mut env = match config.env.as_str() {
        "Pendulum" => Pendulum::new(config.max_episode_steps),
        other => bail!("unknown environment {other:?}"),
    };

    tracing::info!(
        env = %config.env,
        episodes = config.n_episodes(),
        window = config.timesteps_per_iteration,
        "starting training"
    );

    let mut agent = ActorCriticAgent::<TrainBackend, _, _>::from_config(
        config,
        env.observation_size(),
        env.action_size(),
        DEVICE.clone(),
    )?;
    let reports = agent.run(&mut env)?;

    let tail = &reports[reports.len().saturating_sub(10)..];
    if !tail.is_empty() {
        let mean = tail.iter().map(|r| r.value("reward")).sum::<f64>() / tail.len() as f64;
        tracing::info!(episodes = reports.len(), last_10_mean_reward = mean, "training finished");
    }
    Ok(())
}
