//! Proximal Policy Optimization for continuous action spaces.
//!
//! The policy is a diagonal Gaussian: an [`Mlp`] produces the mean and a
//! state-independent vector holds the log standard deviations. A separate
//! [`Mlp`] estimates state values. Both are trained together by one [`Adam`]
//! optimizer on the clipped surrogate objective.

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::env::Env;
use crate::error::{EnvError, TrainError};
use crate::nn::Mlp;
use crate::optim::Adam;
use crate::spaces::BoxSpace;

/// ln(2π)
const LOG_2PI: f32 = 1.837_877;
/// Finished episodes kept for the reported running means.
const EPISODE_WINDOW: usize = 100;

/// PPO hyper-parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpoConfig {
    /// Environment steps collected per update.
    pub n_steps: usize,
    pub batch_size: usize,
    pub n_epochs: usize,
    pub gamma: f32,
    pub gae_lambda: f32,
    pub clip_range: f32,
    pub learning_rate: f32,
    pub ent_coef: f32,
    pub vf_coef: f32,
    pub max_grad_norm: f32,
    /// Hidden layer widths of both networks.
    pub hidden: Vec<usize>,
    pub initial_log_std: f32,
    pub seed: u64,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            n_steps: 2048,
            batch_size: 64,
            n_epochs: 10,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            learning_rate: 3e-4,
            ent_coef: 0.0,
            vf_coef: 0.5,
            max_grad_norm: 0.5,
            hidden: vec![64, 64],
            initial_log_std: 0.0,
            seed: 0,
        }
    }
}

impl PpoConfig {
    /// # Errors
    ///
    /// [`TrainError::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), TrainError> {
        let bad = |name: &'static str, reason: &str| {
            Err(TrainError::Config { name, reason: reason.to_owned() })
        };
        if self.n_steps == 0 {
            return bad("n_steps", "must be positive");
        }
        if self.batch_size == 0 || self.batch_size > self.n_steps {
            return bad("batch_size", "must be between 1 and n_steps");
        }
        if self.n_epochs == 0 {
            return bad("n_epochs", "must be positive");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return bad("gamma", "must lie in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return bad("gae_lambda", "must lie in [0, 1]");
        }
        if !(self.clip_range > 0.0) {
            return bad("clip_range", "must be positive");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return bad("learning_rate", "must be positive");
        }
        if !(self.max_grad_norm > 0.0) {
            return bad("max_grad_norm", "must be positive");
        }
        if self.hidden.contains(&0) {
            return bad("hidden", "layer widths must be positive");
        }
        Ok(())
    }
}

/// A trained diagonal-Gaussian policy, the part of training that is saved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub mean: Mlp,
    pub log_std: Vec<f32>,
    pub observation_space: BoxSpace,
    pub action_space: BoxSpace,
}

impl Policy {
    pub fn new(
        observation_space: BoxSpace,
        action_space: BoxSpace,
        hidden: &[usize],
        initial_log_std: f32,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let mut sizes = vec![observation_space.dim()];
        sizes.extend_from_slice(hidden);
        sizes.push(action_space.dim());
        Self {
            mean: Mlp::new(&sizes, 0.01, rng),
            log_std: vec![initial_log_std; action_space.dim()],
            observation_space,
            action_space,
        }
    }

    /// Deterministic action: the mean, clipped to the action space.
    #[must_use]
    pub fn act(&self, obs: &[f32]) -> Vec<f32> {
        self.action_space.clip(&self.mean.forward(obs))
    }

    /// Draws an unclipped action around `mean`.
    pub fn sample(&self, mean: &[f32], rng: &mut fastrand::Rng) -> Vec<f32> {
        mean.iter()
            .zip(&self.log_std)
            .map(|(m, s)| m + s.exp() * standard_normal(rng))
            .collect()
    }

    #[must_use]
    pub fn log_prob(&self, mean: &[f32], action: &[f32]) -> f32 {
        mean.iter()
            .zip(action)
            .zip(&self.log_std)
            .map(|((m, a), s)| {
                let z = (a - m) / s.exp();
                -0.5 * z * z - s - 0.5 * LOG_2PI
            })
            .sum()
    }

    #[must_use]
    pub fn entropy(&self) -> f32 {
        self.log_std.iter().map(|s| s + 0.5 * (1.0 + LOG_2PI)).sum()
    }

    /// Checks that `env` produces the observations and accepts the actions
    /// this policy was trained on.
    ///
    /// # Errors
    ///
    /// [`TrainError::Incompatible`] on a dimension mismatch.
    pub fn check_env<E: Env + ?Sized>(&self, env: &E) -> Result<(), TrainError> {
        let got = env.obs_size();
        if got != self.observation_space.dim() {
            return Err(TrainError::Incompatible { expected: self.observation_space.dim(), got });
        }
        let got = env.action_size();
        if got != self.action_space.dim() {
            return Err(TrainError::Incompatible { expected: self.action_space.dim(), got });
        }
        Ok(())
    }

    /// Writes the policy as JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// [`TrainError::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        let io = |source| TrainError::Io { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(io)?;
        debug!(path = %path.display(), "policy saved");
        Ok(())
    }

    /// # Errors
    ///
    /// [`TrainError::Io`] for unreadable files, [`TrainError::Format`] for
    /// malformed JSON, [`TrainError::Layer`] for inconsistent layer buffers
    /// and [`TrainError::Incompatible`] when the network does not fit the
    /// stored spaces.
    pub fn load(path: &Path) -> Result<Self, TrainError> {
        let json = std::fs::read_to_string(path)
            .map_err(|source| TrainError::Io { path: path.to_path_buf(), source })?;
        let policy: Self = serde_json::from_str(&json)?;
        if let Some((layer, what, expected, got)) = policy.mean.shape_mismatch() {
            return Err(TrainError::Layer { layer, what, expected, got });
        }
        if policy.mean.in_dim() != policy.observation_space.dim() {
            return Err(TrainError::Incompatible {
                expected: policy.observation_space.dim(),
                got: policy.mean.in_dim(),
            });
        }
        let act_dim = policy.action_space.dim();
        for got in [policy.mean.out_dim(), policy.log_std.len()] {
            if got != act_dim {
                return Err(TrainError::Incompatible { expected: act_dim, got });
            }
        }
        Ok(policy)
    }
}

/// Box-Muller.
fn standard_normal(rng: &mut fastrand::Rng) -> f32 {
    let u1 = 1.0 - rng.f32();
    let u2 = rng.f32();
    (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos()
}

/// Generalized advantage estimates for one rollout. `dones[t]` marks that
/// the transition at `t` ended its episode; `last_value` bootstraps the
/// transition after the rollout.
#[must_use]
pub fn gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    lambda: f32,
) -> Vec<f32> {
    let n = rewards.len();
    let mut advantages = vec![0.0; n];
    let mut running = 0.0;
    for t in (0..n).rev() {
        let next_value = if t + 1 == n { last_value } else { values[t + 1] };
        let live = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_value * live - values[t];
        running = delta + gamma * lambda * live * running;
        advantages[t] = running;
    }
    advantages
}

fn normalize(xs: &mut [f32]) {
    let n = xs.len() as f32;
    let mean = xs.iter().sum::<f32>() / n;
    let std = (xs.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n).sqrt();
    xs.iter_mut().for_each(|x| *x = (*x - mean) / (std + 1e-8));
}

/// Scales `grads` so their global L2 norm is at most `max_norm`. Returns the
/// norm before scaling.
fn clip_grad_norm(grads: &mut [Vec<f32>], max_norm: f32) -> f32 {
    let norm = grads.iter().flatten().map(|g| g * g).sum::<f32>().sqrt();
    if norm > max_norm {
        let scale = max_norm / (norm + 1e-6);
        grads.iter_mut().flatten().for_each(|g| *g *= scale);
    }
    norm
}

fn explained_variance(predicted: &[f32], target: &[f32]) -> f32 {
    let var = |xs: &mut dyn Iterator<Item = f32>| {
        let v: Vec<f32> = xs.collect();
        let n = v.len() as f32;
        let mean = v.iter().sum::<f32>() / n;
        v.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n
    };
    let target_var = var(&mut target.iter().copied());
    if target_var == 0.0 {
        return f32::NAN;
    }
    let residual_var = var(&mut target.iter().zip(predicted).map(|(t, p)| t - p));
    1.0 - residual_var / target_var
}

#[derive(Default)]
struct Rollout {
    obs: Vec<Vec<f32>>,
    actions: Vec<Vec<f32>>,
    log_probs: Vec<f32>,
    rewards: Vec<f32>,
    values: Vec<f32>,
    dones: Vec<bool>,
    advantages: Vec<f32>,
    returns: Vec<f32>,
}

impl Rollout {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn len(&self) -> usize {
        self.rewards.len()
    }
}

/// Progress after an update.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrainingStats {
    pub timesteps: usize,
    pub updates: usize,
    pub episodes: usize,
    /// Over the last hundred finished episodes.
    pub mean_episode_reward: Option<f32>,
    pub mean_episode_length: Option<f32>,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub approx_kl: f32,
    pub clip_fraction: f32,
    pub explained_variance: f32,
    pub std: f32,
}

/// Generic trainer for the Proximal Policy Optimization (PPO) algorithm.
pub struct PpoTrainer<E: Env> {
    env: E,
    config: PpoConfig,
    policy: Policy,
    value: Mlp,
    optimizer: Adam,
    rng: fastrand::Rng,
    obs: Vec<f32>,
    rollout: Rollout,
    episode_reward: f32,
    episode_length: usize,
    recent: VecDeque<(f32, usize)>,
    episodes: usize,
    timesteps: usize,
    updates: usize,
    last: TrainingStats,
}

impl<E: Env> PpoTrainer<E> {
    /// Creates a trainer around `env`, seeding both the environment and the
    /// network initialization with `config.seed`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration or when the first reset fails.
    pub fn new(mut env: E, config: PpoConfig) -> Result<Self, TrainError> {
        config.validate()?;
        let mut rng = fastrand::Rng::with_seed(config.seed);
        env.seed(config.seed);

        let observation_space = env.observation_space();
        let obs_dim = observation_space.dim();
        let policy = Policy::new(
            observation_space,
            env.action_space(),
            &config.hidden,
            config.initial_log_std,
            &mut rng,
        );
        let mut sizes = vec![obs_dim];
        sizes.extend_from_slice(&config.hidden);
        sizes.push(1);
        let value = Mlp::new(&sizes, 1.0, &mut rng);

        let lens: Vec<usize> = policy
            .mean
            .zero_grads()
            .iter()
            .chain(std::iter::once(&policy.log_std))
            .chain(value.zero_grads().iter())
            .map(Vec::len)
            .collect();
        let optimizer = Adam::new(&lens, config.learning_rate);

        let obs = env.reset()?;
        if obs.len() != obs_dim {
            return Err(TrainError::Incompatible { expected: obs_dim, got: obs.len() });
        }
        info!(
            obs_dim,
            act_dim = policy.action_space.dim(),
            params = policy.mean.param_count() + policy.log_std.len() + value.param_count(),
            n_steps = config.n_steps,
            "PPO trainer ready"
        );
        Ok(Self {
            env,
            config,
            policy,
            value,
            optimizer,
            rng,
            obs,
            rollout: Rollout::default(),
            episode_reward: 0.0,
            episode_length: 0,
            recent: VecDeque::with_capacity(EPISODE_WINDOW),
            episodes: 0,
            timesteps: 0,
            updates: 0,
            last: TrainingStats::default(),
        })
    }

    /// Creates a new `PpoTrainer` with the provided environment constructor.
    ///
    /// # Errors
    ///
    /// See [`PpoTrainer::new`].
    pub fn new_with(
        make_env: impl FnOnce() -> Result<E, EnvError>,
        config: PpoConfig,
    ) -> Result<Self, TrainError> {
        Self::new(make_env()?, config)
    }

    /// Collects one rollout and runs one update on it.
    ///
    /// # Errors
    ///
    /// Propagates environment failures; [`TrainError::Diverged`] when a loss
    /// stops being finite.
    pub fn step(&mut self) -> Result<TrainingStats, TrainError> {
        self.collect_rollout()?;
        let stats = self.update()?;
        info!(
            timesteps = stats.timesteps,
            updates = stats.updates,
            episodes = stats.episodes,
            ep_rew_mean = ?stats.mean_episode_reward,
            ep_len_mean = ?stats.mean_episode_length,
            policy_loss = stats.policy_loss,
            value_loss = stats.value_loss,
            approx_kl = stats.approx_kl,
            clip_fraction = stats.clip_fraction,
            explained_variance = stats.explained_variance,
            std = stats.std,
            "PPO update"
        );
        self.last = stats.clone();
        Ok(stats)
    }

    /// Runs [`PpoTrainer::step`] until at least `total_timesteps`
    /// environment steps have been taken in total.
    ///
    /// # Errors
    ///
    /// See [`PpoTrainer::step`].
    pub fn learn(&mut self, total_timesteps: usize) -> Result<TrainingStats, TrainError> {
        while self.timesteps < total_timesteps {
            self.step()?;
        }
        Ok(self.last.clone())
    }

    /// Returns an action for the provided observation using the current policy.
    #[must_use]
    pub fn act(&self, obs: &[f32]) -> Vec<f32> {
        self.policy.act(obs)
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    #[must_use]
    pub fn into_policy(self) -> Policy {
        self.policy
    }

    #[must_use]
    pub fn config(&self) -> &PpoConfig {
        &self.config
    }

    #[must_use]
    pub fn timesteps(&self) -> usize {
        self.timesteps
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn collect_rollout(&mut self) -> Result<(), TrainError> {
        self.rollout.clear();
        for _ in 0..self.config.n_steps {
            let mean = self.policy.mean.forward(&self.obs);
            let action = self.policy.sample(&mean, &mut self.rng);
            let log_prob = self.policy.log_prob(&mean, &action);
            let value = self.value.forward(&self.obs)[0];

            let clipped = self.policy.action_space.clip(&action);
            let (next_obs, reward, done, _info) = self.env.step(&clipped)?;
            self.timesteps += 1;
            self.episode_reward += reward;
            self.episode_length += 1;

            let next_obs = if done {
                self.finish_episode();
                self.env.reset()?
            } else {
                next_obs
            };
            let obs = std::mem::replace(&mut self.obs, next_obs);

            let r = &mut self.rollout;
            r.obs.push(obs);
            r.actions.push(action);
            r.log_probs.push(log_prob);
            r.rewards.push(reward);
            r.values.push(value);
            r.dones.push(done);
        }

        let last_value = self.value.forward(&self.obs)[0];
        let r = &mut self.rollout;
        r.advantages = gae(
            &r.rewards,
            &r.values,
            &r.dones,
            last_value,
            self.config.gamma,
            self.config.gae_lambda,
        );
        r.returns = r.advantages.iter().zip(&r.values).map(|(a, v)| a + v).collect();
        Ok(())
    }

    fn finish_episode(&mut self) {
        if self.recent.len() == EPISODE_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back((self.episode_reward, self.episode_length));
        self.episodes += 1;
        debug!(
            reward = self.episode_reward,
            length = self.episode_length,
            "episode finished"
        );
        self.episode_reward = 0.0;
        self.episode_length = 0;
    }

    fn update(&mut self) -> Result<TrainingStats, TrainError> {
        let cfg = &self.config;
        let rollout = &self.rollout;
        let mean_params = 2 * self.policy.mean.layers.len();
        let log_std_slot = mean_params;
        let act_dim = self.policy.log_std.len();

        let mut indices: Vec<usize> = (0..rollout.len()).collect();
        let (mut pg_total, mut v_total, mut kl_total) = (0.0_f32, 0.0_f32, 0.0_f32);
        let (mut clipped_count, mut samples) = (0_usize, 0_usize);
        let mut batches = 0_usize;

        for _ in 0..cfg.n_epochs {
            self.rng.shuffle(&mut indices);
            for batch in indices.chunks(cfg.batch_size) {
                let b = batch.len() as f32;
                let mut advantages: Vec<f32> = batch.iter().map(|&i| rollout.advantages[i]).collect();
                if batch.len() > 1 {
                    normalize(&mut advantages);
                }
                let std: Vec<f32> = self.policy.log_std.iter().map(|s| s.exp()).collect();

                let mut grads = self.policy.mean.zero_grads();
                grads.push(vec![0.0; act_dim]);
                grads.extend(self.value.zero_grads());
                let (mut pg_loss, mut v_loss) = (0.0_f32, 0.0_f32);

                for (&i, &adv) in batch.iter().zip(&advantages) {
                    let obs = &rollout.obs[i];
                    let action = &rollout.actions[i];

                    let (mean, trace) = self.policy.mean.forward_traced(obs);
                    let log_ratio = self.policy.log_prob(&mean, action) - rollout.log_probs[i];
                    let ratio = log_ratio.exp();
                    let unclipped = ratio * adv;
                    let clipped = ratio.clamp(1.0 - cfg.clip_range, 1.0 + cfg.clip_range) * adv;
                    pg_loss -= unclipped.min(clipped);
                    kl_total += (ratio - 1.0) - log_ratio;
                    if (ratio - 1.0).abs() > cfg.clip_range {
                        clipped_count += 1;
                    }

                    // d(loss)/d(log_prob); zero on the clipped branch
                    let d_log_prob = if unclipped <= clipped { -ratio * adv / b } else { 0.0 };
                    let mut d_mean = vec![0.0; act_dim];
                    for j in 0..act_dim {
                        let z = (action[j] - mean[j]) / std[j];
                        d_mean[j] = d_log_prob * z / std[j];
                        grads[log_std_slot][j] += d_log_prob * (z * z - 1.0);
                    }
                    self.policy.mean.backward(&trace, &d_mean, &mut grads[..mean_params]);

                    let (value, trace) = self.value.forward_traced(obs);
                    let err = value[0] - rollout.returns[i];
                    v_loss += err * err;
                    self.value.backward(
                        &trace,
                        &[cfg.vf_coef * 2.0 * err / b],
                        &mut grads[log_std_slot + 1..],
                    );
                }
                // entropy bonus
                for g in &mut grads[log_std_slot] {
                    *g -= cfg.ent_coef;
                }

                if !(pg_loss.is_finite() && v_loss.is_finite()) {
                    return Err(TrainError::Diverged { timesteps: self.timesteps });
                }
                pg_total += pg_loss / b;
                v_total += v_loss / b;
                samples += batch.len();
                batches += 1;

                clip_grad_norm(&mut grads, cfg.max_grad_norm);
                let params = self
                    .policy
                    .mean
                    .params_mut()
                    .chain(std::iter::once(&mut self.policy.log_std))
                    .chain(self.value.params_mut());
                self.optimizer.step(params, &grads);
            }
        }
        self.updates += 1;

        let recent = self.recent.len() as f32;
        let mean_of = |f: fn(&(f32, usize)) -> f32| {
            (!self.recent.is_empty()).then(|| self.recent.iter().map(f).sum::<f32>() / recent)
        };
        Ok(TrainingStats {
            timesteps: self.timesteps,
            updates: self.updates,
            episodes: self.episodes,
            mean_episode_reward: mean_of(|e| e.0),
            mean_episode_length: mean_of(|e| e.1 as f32),
            policy_loss: pg_total / batches as f32,
            value_loss: v_total / batches as f32,
            entropy: self.policy.entropy(),
            approx_kl: kl_total / samples as f32,
            clip_fraction: clipped_count as f32 / samples as f32,
            explained_variance: explained_variance(&rollout.values, &rollout.returns),
            std: self.policy.log_std.iter().map(|s| s.exp()).sum::<f32>() / act_dim as f32,
        })
    }
}
