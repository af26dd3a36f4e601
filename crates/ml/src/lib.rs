//! # Double Cart-Pole Learning
//!
//! The reinforcement-learning side of the workspace: the [`Env`] contract, the
//! [`DoubleCartpoleEnv`] built on the `physics` and `render` crates, an id
//! [`Registry`] to construct environments from JSON keyword options, and a
//! small PPO implementation ([`PpoTrainer`]) whose result is a serializable
//! [`Policy`].

pub mod double_cartpole;
pub mod env;
pub mod error;
pub mod nn;
pub mod optim;
pub mod registry;
pub mod rl;
pub mod shaping;
pub mod spaces;

pub use double_cartpole::{DoubleCartpoleConfig, DoubleCartpoleEnv};
pub use env::{Env, Info, Step};
pub use error::{EnvError, TrainError};
pub use registry::{make, Registry, DOUBLE_CARTPOLE_ID};
pub use rl::{Policy, PpoConfig, PpoTrainer, TrainingStats};
pub use shaping::Termination;
pub use spaces::BoxSpace;
