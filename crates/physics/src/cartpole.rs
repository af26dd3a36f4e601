//! Double cart-pole assembly
//!
//! A cart slides on a horizontal track and carries two poles chained by
//! pivots. Everything is modelled in pixel units with y pointing up, which is
//! also the frame the environment normalizes its observations in.

use tracing::debug;

use crate::error::{ensure_positive, PhysicsError};
use crate::types::{BodySpec, BodyState, Shape, Vec2};
use crate::world::{BodyHandle, Outline, World};

/// Geometry and mass of one pole.
#[derive(Clone, Debug, PartialEq)]
pub struct PoleConfig {
    /// Distance between the two pivot points.
    pub length: f32,
    pub thickness: f32,
    pub mass: f32,
}

/// Configuration for a [`DoubleCartPole`]
#[derive(Clone, Debug, PartialEq)]
pub struct DoubleCartPoleConfig {
    pub gravity: Vec2,
    pub dt: f32,
    /// Typical object size, forwarded to the engine's tolerances.
    pub length_unit: f32,
    pub track_start: Vec2,
    pub track_end: Vec2,
    /// Initial cart centre. Pole 1 is pinned here.
    pub cart_position: Vec2,
    pub cart_width: f32,
    pub cart_height: f32,
    pub cart_mass: f32,
    /// Horizontal offset of the two groove anchors on the cart.
    pub groove_anchor: f32,
    pub pole_1: PoleConfig,
    pub pole_2: PoleConfig,
    /// Initial pole angles are drawn uniformly from this range (radians from +x).
    pub initial_angle_range: (f32, f32),
    pub cart_damping: f32,
    pub pole_damping: f32,
}

impl Default for DoubleCartPoleConfig {
    fn default() -> Self {
        use std::f32::consts::PI;
        let pole = PoleConfig { length: 160.0, thickness: 15.0, mass: 1.0 };
        Self {
            gravity: Vec2::new(0.0, -1000.0),
            dt: 1.0 / 60.0,
            length_unit: 100.0,
            track_start: Vec2::new(0.0, 400.0),
            track_end: Vec2::new(800.0, 400.0),
            cart_position: Vec2::new(400.0, 400.0),
            cart_width: 80.0,
            cart_height: 40.0,
            cart_mass: 1.0,
            groove_anchor: 20.0,
            pole_1: pole.clone(),
            pole_2: pole,
            // upright +- 5 degrees
            initial_angle_range: (17.0 * PI / 36.0, 19.0 * PI / 36.0),
            cart_damping: 0.9999,
            pole_damping: 0.999,
        }
    }
}

/// The static body the cart slides on.
#[derive(Copy, Clone, Debug)]
pub struct Track {
    pub body: BodyHandle,
    pub start: Vec2,
    pub end: Vec2,
}

impl Track {
    /// # Errors
    ///
    /// Fails when `start == end`.
    pub fn new(world: &mut World, start: Vec2, end: Vec2) -> Result<Self, PhysicsError> {
        let body = world.add_body(&BodySpec::fixed(Shape::Segment { a: start, b: end, radius: 0.0 }))?;
        Ok(Self { body, start, end })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Cart {
    pub body: BodyHandle,
    pub width: f32,
    pub height: f32,
}

impl Cart {
    /// # Errors
    ///
    /// Fails on a non-positive size or mass.
    pub fn new(
        world: &mut World,
        position: Vec2,
        width: f32,
        height: f32,
        mass: f32,
    ) -> Result<Self, PhysicsError> {
        let body = world.add_body(&BodySpec::dynamic(
            position,
            0.0,
            mass,
            Shape::Box { width, height },
        ))?;
        Ok(Self { body, width, height })
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Pole {
    pub body: BodyHandle,
    pub length: f32,
    pub thickness: f32,
}

impl Pole {
    /// Builds a pole spanning `free_end`..`jointed_end`.
    ///
    /// The body sits at the midpoint and is rotated so that its local +x
    /// axis points at `free_end`: the jointed end is at `(-length / 2, 0)`
    /// and the free end at `(length / 2, 0)`. The box is one thickness longer
    /// than the segment so the rounded-looking ends cover the pivots.
    ///
    /// # Errors
    ///
    /// Fails when the ends coincide or thickness/mass are not positive.
    pub fn from_endpoints(
        world: &mut World,
        free_end: Vec2,
        jointed_end: Vec2,
        thickness: f32,
        mass: f32,
    ) -> Result<Self, PhysicsError> {
        let center = (free_end + jointed_end) * 0.5;
        let length = ensure_positive("pole length", (free_end - jointed_end).length())?;
        let angle = (free_end - center).angle();
        let body = world.add_body(&BodySpec::dynamic(
            center,
            angle,
            mass,
            Shape::Box { width: length + thickness, height: thickness },
        ))?;
        Ok(Self { body, length, thickness })
    }

    /// Body-space position of the free end.
    #[must_use]
    pub fn tip(&self) -> Vec2 {
        Vec2::new(self.length * 0.5, 0.0)
    }

    /// Body-space position of the jointed end.
    #[must_use]
    pub fn base(&self) -> Vec2 {
        Vec2::new(-self.length * 0.5, 0.0)
    }
}

/// State of the three moving bodies after a step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DoubleCartPoleState {
    pub cart: BodyState,
    pub pole_1: BodyState,
    pub pole_2: BodyState,
}

/// Which part of the assembly a drawn shape belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Part {
    Track,
    Cart,
    Pole1,
    Pole2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ShapeSnapshot {
    pub part: Part,
    pub outline: Outline,
}

/// Everything a renderer needs to draw one frame, in world coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneSnapshot {
    pub cart: Vec2,
    /// Joint between pole 1 and pole 2.
    pub pivot: Vec2,
    pub pole_lengths: [f32; 2],
    pub shapes: Vec<ShapeSnapshot>,
}

/// A cart with two chained poles living in its own [`World`].
pub struct DoubleCartPole {
    pub world: World,
    pub track: Track,
    pub cart: Cart,
    pub pole_1: Pole,
    pub pole_2: Pole,
    pub config: DoubleCartPoleConfig,
}

impl DoubleCartPole {
    /// Builds the assembly with pole angles drawn from
    /// [`DoubleCartPoleConfig::initial_angle_range`].
    ///
    /// # Errors
    ///
    /// Propagates construction errors for invalid configurations.
    pub fn new(config: DoubleCartPoleConfig, rng: &mut fastrand::Rng) -> Result<Self, PhysicsError> {
        let (lo, hi) = config.initial_angle_range;
        let alpha = lo + rng.f32() * (hi - lo);
        let beta = lo + rng.f32() * (hi - lo);
        Self::with_angles(config, alpha, beta)
    }

    /// Builds the assembly with pole 1 at `alpha` and pole 2 at `beta`
    /// radians from +x.
    ///
    /// # Errors
    ///
    /// Propagates construction errors for invalid configurations.
    pub fn with_angles(config: DoubleCartPoleConfig, alpha: f32, beta: f32) -> Result<Self, PhysicsError> {
        let mut world = World::new(config.gravity, config.dt, config.length_unit)?;

        let track = Track::new(&mut world, config.track_start, config.track_end)?;
        let base = config.cart_position;
        let cart = Cart::new(
            &mut world,
            base,
            config.cart_width,
            config.cart_height,
            config.cart_mass,
        )?;

        let pole_1_tip = base + Vec2::from_angle(alpha) * config.pole_1.length;
        let pole_1 = Pole::from_endpoints(
            &mut world,
            pole_1_tip,
            base,
            config.pole_1.thickness,
            config.pole_1.mass,
        )?;
        let pole_2_tip = pole_1_tip + Vec2::from_angle(beta) * config.pole_2.length;
        let pole_2 = Pole::from_endpoints(
            &mut world,
            pole_2_tip,
            pole_1_tip,
            config.pole_2.thickness,
            config.pole_2.mass,
        )?;

        // Groove ends are given in the track body's frame, which is the world
        // frame since the track body sits at the origin.
        for offset in [-config.groove_anchor, config.groove_anchor] {
            world.add_groove(
                track.body,
                config.track_start,
                config.track_end,
                cart.body,
                Vec2::new(offset, 0.0),
            )?;
        }
        world.add_pivot(cart.body, Vec2::ZERO, pole_1.body, pole_1.base())?;
        world.add_pivot(pole_1.body, pole_1.tip(), pole_2.body, pole_2.base())?;

        debug!(alpha, beta, "double cart-pole assembled");
        Ok(Self { world, track, cart, pole_1, pole_2, config })
    }

    /// Applies a horizontal force at the cart's local origin.
    ///
    /// # Errors
    ///
    /// Only fails if the cart body went missing from the world.
    pub fn apply_force(&mut self, force: f32) -> Result<(), PhysicsError> {
        self.world
            .apply_force_at_local_point(self.cart.body, Vec2::new(force, 0.0), Vec2::ZERO)
    }

    /// Damps every moving body with its configured factor.
    ///
    /// # Errors
    ///
    /// Only fails if a body went missing from the world.
    pub fn update_velocities(&mut self) -> Result<(), PhysicsError> {
        self.world.update_velocity(self.pole_1.body, self.config.pole_damping)?;
        self.world.update_velocity(self.pole_2.body, self.config.pole_damping)?;
        self.world.update_velocity(self.cart.body, self.config.cart_damping)
    }

    pub fn step(&mut self) {
        self.world.step();
    }

    /// # Errors
    ///
    /// Only fails if a body went missing from the world.
    pub fn state(&self) -> Result<DoubleCartPoleState, PhysicsError> {
        Ok(DoubleCartPoleState {
            cart: self.world.body_state(self.cart.body)?,
            pole_1: self.world.body_state(self.pole_1.body)?,
            pole_2: self.world.body_state(self.pole_2.body)?,
        })
    }

    /// World position of the joint between the two poles.
    ///
    /// # Errors
    ///
    /// Only fails if pole 1 went missing from the world.
    pub fn pivot_point(&self) -> Result<Vec2, PhysicsError> {
        self.world.local_to_world(self.pole_1.body, self.pole_1.tip())
    }

    /// # Errors
    ///
    /// Only fails if a body went missing from the world.
    pub fn snapshot(&self) -> Result<SceneSnapshot, PhysicsError> {
        let parts = [
            (Part::Track, self.track.body),
            (Part::Cart, self.cart.body),
            (Part::Pole1, self.pole_1.body),
            (Part::Pole2, self.pole_2.body),
        ];
        let shapes = parts
            .iter()
            .map(|&(part, body)| {
                Ok(ShapeSnapshot { part, outline: self.world.outline(body)? })
            })
            .collect::<Result<Vec<_>, PhysicsError>>()?;
        Ok(SceneSnapshot {
            cart: self.world.body_state(self.cart.body)?.position,
            pivot: self.pivot_point()?,
            pole_lengths: [self.pole_1.length, self.pole_2.length],
            shapes,
        })
    }
}
