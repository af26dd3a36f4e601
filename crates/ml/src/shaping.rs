//! Observation normalization and reward shaping for the double cart-pole.
//!
//! Every observation component is clamped to `[-1, 1]`; a component that
//! saturates at `±1` marks a terminal condition.

use std::f32::consts::PI;

use physics::DoubleCartPoleState;
use serde::{Deserialize, Serialize};

pub const OBS_DIM: usize = 6;
pub const ACTION_DIM: usize = 1;

/// Newtons per unit of action.
pub const FORCE_SCALE: f32 = 1200.0;
pub const TARGET_X: f32 = 400.0;
/// Distance from each track end at which the cart counts as hitting the wall.
pub const WALL_MARGIN: f32 = 40.0;
pub const TRACK_END: f32 = 800.0;
pub const VELOCITY_SCALE: f32 = 610.0;
pub const ANGULAR_VELOCITY_SCALE: f32 = 15.0;
pub const PENALTY: f32 = -50.0;

/// Why an episode ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A pole tipped more than 20 degrees from upright.
    Imbalance,
    /// The cart reached a track end.
    Wall,
    TimeLimit,
}

impl Termination {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imbalance => "imbalance",
            Self::Wall => "wall",
            Self::TimeLimit => "time_limit",
        }
    }
}

/// Maps an angle from +x to `[-1, 1]`: 0 upright, `∓1` at 20 degrees
/// right/left of upright.
#[must_use]
pub fn pole_angle(theta: f32) -> f32 {
    (-9.0 * theta / PI + 4.5).clamp(-1.0, 1.0)
}

/// Signed distance of the cart from the target line, scaled so each wall is
/// at `±1`.
#[must_use]
pub fn distance(x: f32) -> f32 {
    if x < TARGET_X {
        ((x - TARGET_X) / (TARGET_X - WALL_MARGIN)).clamp(-1.0, 0.0)
    } else {
        ((x - TARGET_X) / (TRACK_END - WALL_MARGIN - TARGET_X)).clamp(0.0, 1.0)
    }
}

#[must_use]
pub fn observe(state: &DoubleCartPoleState) -> [f32; OBS_DIM] {
    [
        (state.cart.velocity.x / VELOCITY_SCALE).clamp(-1.0, 1.0),
        pole_angle(state.pole_1.angle),
        pole_angle(state.pole_2.angle),
        (state.pole_1.angular_velocity / ANGULAR_VELOCITY_SCALE).clamp(-1.0, 1.0),
        (state.pole_2.angular_velocity / ANGULAR_VELOCITY_SCALE).clamp(-1.0, 1.0),
        distance(state.cart.position.x),
    ]
}

/// Reward for `obs` and the terminal condition it triggers, if any. The time
/// limit is the caller's concern.
#[must_use]
pub fn assess(obs: &[f32; OBS_DIM]) -> (f32, Option<Termination>) {
    if obs[1].abs() >= 1.0 || obs[2].abs() >= 1.0 {
        (PENALTY, Some(Termination::Imbalance))
    } else if obs[5].abs() >= 1.0 {
        (PENALTY, Some(Termination::Wall))
    } else {
        (1.0 + 0.5 * (1.0 - obs[5].abs()), None)
    }
}
