use crate::error::EnvError;
use crate::spaces::BoxSpace;

/// Extra diagnostics returned alongside each transition.
pub type Info = serde_json::Map<String, serde_json::Value>;

/// One transition: `(observation, reward, done, info)`.
pub type Step = (Vec<f32>, f32, bool, Info);

/// Reinforcement learning environment trait.
///
/// Inspired by classic frameworks like OpenAI Gym, this trait defines the core
/// interface an environment must provide. Each call to [`step`] advances the
/// simulation by one action and returns the new observation vector, a reward
/// signal, whether the episode has terminated and a free-form info map.
///
/// The trait is object safe so registries can hand out `Box<dyn Env>`.
///
/// [`step`]: Env::step
pub trait Env {
    /// Reset the environment to its starting state and return the initial
    /// observation vector.
    fn reset(&mut self) -> Result<Vec<f32>, EnvError>;

    /// Advance the environment by one action.
    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError>;

    /// Draw the current state. Returns `false` once the rendering surface
    /// has been closed; environments without one always return `true`.
    fn render(&mut self) -> Result<bool, EnvError> {
        Ok(true)
    }

    /// Release any rendering surface. Safe to call more than once.
    fn close(&mut self) -> Result<(), EnvError> {
        Ok(())
    }

    /// Reseed the randomness used by [`Env::reset`].
    fn seed(&mut self, seed: u64);

    fn observation_space(&self) -> BoxSpace;

    fn action_space(&self) -> BoxSpace;

    /// Size of the observation vector.
    fn obs_size(&self) -> usize {
        self.observation_space().dim()
    }

    /// Size of the action vector.
    fn action_size(&self) -> usize {
        self.action_space().dim()
    }
}

impl<E: Env + ?Sized> Env for Box<E> {
    fn reset(&mut self) -> Result<Vec<f32>, EnvError> {
        (**self).reset()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        (**self).step(action)
    }

    fn render(&mut self) -> Result<bool, EnvError> {
        (**self).render()
    }

    fn close(&mut self) -> Result<(), EnvError> {
        (**self).close()
    }

    fn seed(&mut self, seed: u64) {
        (**self).seed(seed);
    }

    fn observation_space(&self) -> BoxSpace {
        (**self).observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        (**self).action_space()
    }
}
