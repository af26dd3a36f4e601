//! # Double Cart-Pole CLI
//!
//! `train` runs PPO on `double-cartpole-custom-v0` and saves the policy as
//! JSON; `evaluate` replays a saved policy, optionally rendering it.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use double_cartpole::app::{self, EvaluateOptions, TrainOptions};
use ml::PpoConfig;
use render::RenderMode;

/// Train and evaluate PPO agents on the double cart-pole.
#[derive(Parser)]
#[command(name = "double-cartpole", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a PPO agent and save its policy.
    Train {
        /// Total environment steps.
        #[arg(long, default_value_t = 1_500_000)]
        timesteps: usize,

        /// Episode length.
        #[arg(long, default_value_t = 1000)]
        n_steps: usize,

        /// Where to write the policy.
        #[arg(short, long, default_value = "new_agent.json")]
        output: PathBuf,

        /// Random seed.
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },

    /// Run episodes with a saved policy.
    Evaluate {
        /// Policy file; without one the cart is left alone.
        #[arg(short, long)]
        policy: Option<PathBuf>,

        /// Number of episodes to run.
        #[arg(short = 'n', long, default_value_t = 5)]
        episodes: usize,

        /// Episode length.
        #[arg(long, default_value_t = 1000)]
        n_steps: usize,

        /// Draw every step.
        #[arg(long)]
        render: bool,

        /// human, frames or rgb_array.
        #[arg(long, default_value = "human")]
        render_mode: RenderMode,

        /// Root directory for PNG frames.
        #[arg(long, default_value = "frames")]
        frame_dir: PathBuf,

        /// Random seed.
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    app::init_logging();
    match Cli::parse().command {
        Command::Train { timesteps, n_steps, output, seed } => {
            let options = TrainOptions {
                timesteps,
                n_steps,
                output,
                ppo: PpoConfig { seed, ..PpoConfig::default() },
            };
            app::train(&options)?;
        }
        Command::Evaluate { policy, episodes, n_steps, render, render_mode, frame_dir, seed } => {
            let options =
                EvaluateOptions { policy, episodes, n_steps, render, render_mode, frame_dir, seed };
            let summaries = app::evaluate(&options)?;
            if !summaries.is_empty() {
                let mean = summaries.iter().map(|s| s.reward).sum::<f32>() / summaries.len() as f32;
                tracing::info!(episodes = summaries.len(), mean_reward = mean, "Evaluation complete");
            }
        }
    }
    Ok(())
}
