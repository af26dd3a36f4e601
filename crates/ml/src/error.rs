use std::path::PathBuf;

use physics::PhysicsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvError {
    #[error("action has {got} values, expected {expected}")]
    ActionShape { expected: usize, got: usize },
    #[error("unknown environment id `{0}`")]
    UnknownEnvironment(String),
    #[error("environment id `{0}` is already registered")]
    DuplicateId(String),
    #[error("invalid environment options: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("invalid PPO setting `{name}`: {reason}")]
    Config { name: &'static str, reason: String },
    #[error("policy expects {expected} observations, environment produces {got}")]
    Incompatible { expected: usize, got: usize },
    #[error("policy layer {layer}: {what} size is {got}, expected {expected}")]
    Layer { layer: usize, what: &'static str, expected: usize, got: usize },
    #[error("non-finite loss after {timesteps} timesteps")]
    Diverged { timesteps: usize },
    #[error("policy file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed policy: {0}")]
    Format(#[from] serde_json::Error),
}
