#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
//! # Double Cart-Pole Physics
//!
//! A thin layer over the `rapier2d` rigid-body engine that builds and drives a
//! cart carrying two chained poles.
//!
//! ## Key Components
//!
//! -   **World:** [`World`] owns every engine set and the pipeline, and exposes
//!     the handful of operations the cart-pole needs: adding boxes and
//!     segments, groove and pivot joints, local forces, velocity damping and
//!     fixed-timestep stepping.
//! -   **Assembly:** [`DoubleCartPole`] builds the cart, both poles and the
//!     track from a [`DoubleCartPoleConfig`], and reads their state back.
//! -   **Snapshots:** [`SceneSnapshot`] carries world-space outlines of every
//!     shape so a renderer never touches the engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use physics::{DoubleCartPole, DoubleCartPoleConfig};
//!
//! let mut rng = fastrand::Rng::with_seed(7);
//! let mut cp = DoubleCartPole::new(DoubleCartPoleConfig::default(), &mut rng)?;
//! cp.apply_force(600.0)?;
//! cp.update_velocities()?;
//! cp.step();
//! let state = cp.state()?;
//! ```

pub mod cartpole;
pub mod error;
pub mod types;
pub mod world;

pub use cartpole::{
    Cart, DoubleCartPole, DoubleCartPoleConfig, DoubleCartPoleState, Part, Pole, PoleConfig,
    SceneSnapshot, ShapeSnapshot, Track,
};
pub use error::PhysicsError;
pub use types::{BodyKind, BodySpec, BodyState, Shape, Vec2};
pub use world::{BodyHandle, JointHandle, Outline, World};
