use std::path::PathBuf;

use physics::{DoubleCartPole, DoubleCartPoleConfig};
use render::{RenderMode, Renderer};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::env::{Env, Info, Step};
use crate::error::EnvError;
use crate::shaping::{self, Termination, ACTION_DIM, FORCE_SCALE, OBS_DIM};
use crate::spaces::BoxSpace;

/// Keyword options accepted by the `double-cartpole-custom-v0` entry point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoubleCartpoleConfig {
    /// Open a rendering surface at construction.
    pub render_sim: bool,
    /// Episode length; the episode ends when the step counter reaches it.
    pub n_steps: usize,
    pub render_mode: RenderMode,
    /// Root directory for [`RenderMode::Frames`].
    pub frame_dir: PathBuf,
    /// Seed for the initial pole angles. Unseeded environments draw from
    /// the thread-local generator.
    pub seed: Option<u64>,
}

impl Default for DoubleCartpoleConfig {
    fn default() -> Self {
        Self {
            render_sim: false,
            n_steps: 1000,
            render_mode: RenderMode::default(),
            frame_dir: PathBuf::from("frames"),
            seed: None,
        }
    }
}

/// A cart with two chained poles that must be kept upright near the centre
/// of the track.
pub struct DoubleCartpoleEnv {
    config: DoubleCartpoleConfig,
    physics: DoubleCartPoleConfig,
    cartpole: DoubleCartPole,
    renderer: Option<Renderer>,
    rng: fastrand::Rng,
    force: f32,
    time_step: usize,
    done: bool,
    termination: Option<Termination>,
}

impl DoubleCartpoleEnv {
    /// # Errors
    ///
    /// Fails when the rendering surface cannot be opened.
    pub fn new(config: DoubleCartpoleConfig) -> Result<Self, EnvError> {
        Self::with_physics(config, DoubleCartPoleConfig::default())
    }

    /// Like [`DoubleCartpoleEnv::new`] with a custom assembly.
    ///
    /// # Errors
    ///
    /// Fails on an invalid assembly or when the rendering surface cannot be
    /// opened.
    pub fn with_physics(
        config: DoubleCartpoleConfig,
        physics: DoubleCartPoleConfig,
    ) -> Result<Self, EnvError> {
        let mut rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        let cartpole = DoubleCartPole::new(physics.clone(), &mut rng)?;
        let renderer = if config.render_sim {
            Some(Renderer::open(config.render_mode, &config.frame_dir)?)
        } else {
            None
        };
        debug!(
            n_steps = config.n_steps,
            render_sim = config.render_sim,
            "double cart-pole environment created"
        );
        Ok(Self {
            config,
            physics,
            cartpole,
            renderer,
            rng,
            force: 0.0,
            time_step: 0,
            done: false,
            termination: None,
        })
    }

    #[must_use]
    pub fn config(&self) -> &DoubleCartpoleConfig {
        &self.config
    }

    #[must_use]
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Force applied by the last step, in newtons.
    #[must_use]
    pub fn force(&self) -> f32 {
        self.force
    }

    #[must_use]
    pub fn cartpole(&self) -> &DoubleCartPole {
        &self.cartpole
    }

    /// Direct access to the simulation, e.g. to place bodies in tests.
    pub fn cartpole_mut(&mut self) -> &mut DoubleCartPole {
        &mut self.cartpole
    }

    #[must_use]
    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    /// Current normalized observation.
    ///
    /// # Errors
    ///
    /// Only fails if the simulation lost one of its bodies.
    pub fn observe(&self) -> Result<[f32; OBS_DIM], EnvError> {
        Ok(shaping::observe(&self.cartpole.state()?))
    }

    fn finish(&mut self, why: Termination) {
        if !self.done {
            self.done = true;
            self.termination = Some(why);
            debug!(time_step = self.time_step, termination = why.as_str(), "episode finished");
        }
    }
}

impl Env for DoubleCartpoleEnv {
    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        self.cartpole = DoubleCartPole::new(self.physics.clone(), &mut self.rng)?;
        self.force = 0.0;
        self.time_step = 0;
        self.done = false;
        self.termination = None;
        debug!("double cart-pole environment reset");
        Ok(self.observe()?.to_vec())
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        let &[action] = action else {
            return Err(EnvError::ActionShape { expected: ACTION_DIM, got: action.len() });
        };
        self.force = action * FORCE_SCALE;
        self.cartpole.apply_force(self.force)?;
        self.cartpole.update_velocities()?;
        self.cartpole.step();
        self.time_step += 1;

        let obs = self.observe()?;
        let (reward, termination) = shaping::assess(&obs);
        if let Some(why) = termination {
            self.finish(why);
        }
        if self.time_step == self.config.n_steps {
            self.finish(Termination::TimeLimit);
        }

        let mut info = Info::new();
        info.insert("time_step".into(), json!(self.time_step));
        if let Some(why) = self.termination {
            info.insert("termination".into(), json!(why.as_str()));
        }
        Ok((obs.to_vec(), reward, self.done, info))
    }

    fn render(&mut self) -> Result<bool, EnvError> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(true);
        };
        let snapshot = self.cartpole.snapshot()?;
        Ok(renderer.render(&snapshot, self.force, FORCE_SCALE)?)
    }

    fn close(&mut self) -> Result<(), EnvError> {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.close();
        }
        Ok(())
    }

    fn seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }

    fn observation_space(&self) -> BoxSpace {
        BoxSpace::uniform(OBS_DIM, -1.0, 1.0)
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::uniform(ACTION_DIM, -1.0, 1.0)
    }
}
