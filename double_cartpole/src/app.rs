//! # Training and Evaluation Programs
//!
//! [`train`] builds the registered environment headless, runs PPO for a fixed
//! number of timesteps and saves the policy. [`evaluate`] replays a saved
//! policy (or a do-nothing controller) for a few episodes, optionally
//! rendering every step.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ml::{Env, Policy, PpoConfig, PpoTrainer, TrainingStats, DOUBLE_CARTPOLE_ID};
use render::RenderMode;
use serde_json::json;

/// Installs the global `tracing` subscriber. Call once, from `main`.
pub fn init_logging() {
    tracing_subscriber::fmt::init();
}

#[derive(Clone, Debug)]
pub struct TrainOptions {
    pub timesteps: usize,
    /// Episode length of the training environment.
    pub n_steps: usize,
    pub output: PathBuf,
    pub ppo: PpoConfig,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            timesteps: 1_500_000,
            n_steps: 1000,
            output: PathBuf::from("new_agent.json"),
            ppo: PpoConfig::default(),
        }
    }
}

/// # Errors
///
/// Fails when the environment cannot be built, training diverges or the
/// policy cannot be written.
pub fn train(options: &TrainOptions) -> Result<TrainingStats> {
    let env = ml::make(
        DOUBLE_CARTPOLE_ID,
        json!({ "render_sim": false, "n_steps": options.n_steps }),
    )?;
    tracing::info!(
        timesteps = options.timesteps,
        n_steps = options.n_steps,
        seed = options.ppo.seed,
        "Training PPO on {DOUBLE_CARTPOLE_ID}"
    );

    let mut trainer = PpoTrainer::new(env, options.ppo.clone())?;
    let stats = trainer.learn(options.timesteps).context("training failed")?;
    trainer
        .policy()
        .save(&options.output)
        .with_context(|| format!("failed to save policy to {}", options.output.display()))?;
    tracing::info!(
        path = %options.output.display(),
        ep_rew_mean = ?stats.mean_episode_reward,
        "Policy saved"
    );
    Ok(stats)
}

#[derive(Clone, Debug)]
pub struct EvaluateOptions {
    /// Saved policy; `None` pushes with zero force.
    pub policy: Option<PathBuf>,
    pub episodes: usize,
    pub n_steps: usize,
    pub render: bool,
    pub render_mode: RenderMode,
    pub frame_dir: PathBuf,
    pub seed: Option<u64>,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            policy: None,
            episodes: 5,
            n_steps: 1000,
            render: false,
            render_mode: RenderMode::Human,
            frame_dir: PathBuf::from("frames"),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub reward: f32,
    pub length: usize,
    /// `imbalance`, `wall` or `time_limit`; `None` if the window was closed
    /// mid-episode.
    pub termination: Option<String>,
}

/// # Errors
///
/// Fails when the policy cannot be loaded or does not fit the environment,
/// or when stepping or rendering fails.
pub fn evaluate(options: &EvaluateOptions) -> Result<Vec<EpisodeSummary>> {
    let policy = options
        .policy
        .as_deref()
        .map(|path| {
            Policy::load(path).with_context(|| format!("failed to load policy {}", path.display()))
        })
        .transpose()?;

    let mut env = ml::make(
        DOUBLE_CARTPOLE_ID,
        json!({
            "render_sim": options.render,
            "n_steps": options.n_steps,
            "render_mode": options.render_mode,
            "frame_dir": options.frame_dir,
            "seed": options.seed,
        }),
    )?;
    if let Some(policy) = &policy {
        policy.check_env(&*env)?;
    }

    let mut summaries = Vec::with_capacity(options.episodes);
    'episodes: for episode in 0..options.episodes {
        let mut obs = env.reset()?;
        let mut summary = EpisodeSummary { episode, reward: 0.0, length: 0, termination: None };
        loop {
            let action = policy.as_ref().map_or_else(|| vec![0.0], |p| p.act(&obs));
            let (next, reward, done, info) = env.step(&action)?;
            summary.reward += reward;
            summary.length += 1;
            obs = next;

            if options.render && !env.render()? {
                tracing::info!("Window closed, stopping evaluation");
                summaries.push(summary);
                break 'episodes;
            }
            if done {
                summary.termination = info
                    .get("termination")
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                break;
            }
        }
        tracing::info!(
            episode,
            reward = summary.reward,
            length = summary.length,
            termination = summary.termination.as_deref().unwrap_or("-"),
            "Episode finished"
        );
        summaries.push(summary);
    }
    env.close()?;
    Ok(summaries)
}
