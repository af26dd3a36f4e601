//! # Physics World
//!
//! [`World`] bundles every `rapier2d` set together with the pipeline that
//! advances them. `PhysicsPipeline::step` needs mutable access to all of them
//! at once, so they live side by side and are only reachable through the
//! methods below.
//!
//! Bodies are addressed with [`BodyHandle`], an index into the world's own
//! body records. The records keep the mass and moment of inertia that were
//! requested at construction, which [`World::update_velocity`] needs before
//! the engine has computed its own mass properties.

use rapier2d::prelude::{
    CCDSolver, ColliderBuilder, ColliderSet, DefaultBroadPhase, GenericJointBuilder,
    ImpulseJointHandle, ImpulseJointSet, IntegrationParameters, IslandManager, JointAxesMask,
    JointAxis, MultibodyJointSet, NarrowPhase, PhysicsPipeline, Real, RevoluteJointBuilder,
    RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet, UnitVector, Vector,
};
use tracing::trace;

use crate::error::{ensure_finite, ensure_positive, PhysicsError};
use crate::types::{BodyKind, BodySpec, BodyState, Shape, Vec2};

/// Index of a body inside a [`World`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) usize);

impl BodyHandle {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JointHandle(ImpulseJointHandle);

#[derive(Clone, Debug)]
struct BodyRecord {
    handle: RigidBodyHandle,
    kind: BodyKind,
    mass: f32,
    moment: f32,
    shape: Shape,
}

/// World outline of a body's shape, ready to be drawn.
#[derive(Clone, Debug, PartialEq)]
pub enum Outline {
    Polygon(Vec<Vec2>),
    Segment { a: Vec2, b: Vec2, radius: f32 },
}

pub struct World {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    ccd: CCDSolver,
    params: IntegrationParameters,
    gravity: Vector<Real>,
    records: Vec<BodyRecord>,
}

impl World {
    /// Creates an empty world.
    ///
    /// `length_unit` is the size of a typical object in world units. The
    /// engine scales its internal tolerances by it, which matters here since
    /// the cart-pole is modelled in pixels rather than metres.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] when `dt` or `length_unit`
    /// is not a positive finite number or `gravity` is not finite.
    pub fn new(gravity: Vec2, dt: f32, length_unit: f32) -> Result<Self, PhysicsError> {
        ensure_positive("dt", dt)?;
        ensure_positive("length_unit", length_unit)?;
        ensure_finite("gravity.x", gravity.x)?;
        ensure_finite("gravity.y", gravity.y)?;

        let mut params = IntegrationParameters::default();
        params.dt = dt;
        params.length_unit = length_unit;

        Ok(Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            ccd: CCDSolver::new(),
            params,
            gravity: gravity.to_vector(),
            records: Vec::new(),
        })
    }

    #[must_use]
    pub fn dt(&self) -> f32 {
        self.params.dt
    }

    #[must_use]
    pub fn gravity(&self) -> Vec2 {
        self.gravity.into()
    }

    #[must_use]
    pub fn body_count(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Inserts a body with a single sensor shape.
    ///
    /// Dynamic bodies never fall asleep: a balanced pole can be almost at
    /// rest and must still react to the next cart force.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::InvalidArgument`] for non-finite placement,
    /// a non-positive mass on a dynamic body, or a degenerate shape.
    pub fn add_body(&mut self, spec: &BodySpec) -> Result<BodyHandle, PhysicsError> {
        ensure_finite("position.x", spec.position.x)?;
        ensure_finite("position.y", spec.position.y)?;
        ensure_finite("angle", spec.angle)?;

        let (builder, mass) = match spec.kind {
            BodyKind::Dynamic => (
                RigidBodyBuilder::dynamic().can_sleep(false),
                ensure_positive("mass", spec.mass)?,
            ),
            BodyKind::Static => (RigidBodyBuilder::fixed(), 0.0),
        };
        let body = builder
            .translation(spec.position.to_vector())
            .rotation(spec.angle)
            .build();
        let handle = self.bodies.insert(body);

        let collider = match spec.shape {
            Shape::Box { width, height } => {
                ensure_positive("width", width)?;
                ensure_positive("height", height)?;
                ColliderBuilder::cuboid(width * 0.5, height * 0.5)
            }
            Shape::Segment { a, b, radius } => {
                if !a.is_finite() || !b.is_finite() || a == b {
                    return Err(PhysicsError::InvalidArgument {
                        name: "segment",
                        value: (b - a).length(),
                    });
                }
                if radius > 0.0 {
                    ColliderBuilder::capsule_from_endpoints(a.to_point(), b.to_point(), radius)
                } else {
                    ColliderBuilder::segment(a.to_point(), b.to_point())
                }
            }
        };
        let collider = match spec.kind {
            BodyKind::Dynamic => collider.mass(mass),
            BodyKind::Static => collider.density(0.0),
        }
        .sensor(true)
        .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        let index = self.records.len();
        self.records.push(BodyRecord {
            handle,
            kind: spec.kind,
            mass,
            moment: spec.shape.moment(mass),
            shape: spec.shape,
        });
        trace!(index, kind = ?spec.kind, "body added");
        Ok(BodyHandle(index))
    }

    /// Constrains the point `anchor_b` of body `b` to slide along the segment
    /// `groove_start`..`groove_end` of body `a`. Rotation stays free, so two
    /// grooves are needed to keep a body level.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown bodies or a zero-length groove.
    pub fn add_groove(
        &mut self,
        a: BodyHandle,
        groove_start: Vec2,
        groove_end: Vec2,
        b: BodyHandle,
        anchor_b: Vec2,
    ) -> Result<JointHandle, PhysicsError> {
        let body_a = self.record(a)?.handle;
        let body_b = self.record(b)?.handle;
        let direction = groove_end - groove_start;
        let length = ensure_positive("groove length", direction.length())?;
        let axis = UnitVector::new_normalize(direction.to_vector());

        let joint = GenericJointBuilder::new(JointAxesMask::LIN_Y)
            .local_anchor1(groove_start.to_point())
            .local_anchor2(anchor_b.to_point())
            .local_axis1(axis)
            .local_axis2(axis)
            .limits(JointAxis::LinX, [0.0, length])
            .contacts_enabled(false)
            .build();
        let handle = self.impulse_joints.insert(body_a, body_b, joint, true);
        Ok(JointHandle(handle))
    }

    /// Pins `anchor_a` of body `a` to `anchor_b` of body `b`, leaving the
    /// relative rotation free.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for handles from another world.
    pub fn add_pivot(
        &mut self,
        a: BodyHandle,
        anchor_a: Vec2,
        b: BodyHandle,
        anchor_b: Vec2,
    ) -> Result<JointHandle, PhysicsError> {
        let body_a = self.record(a)?.handle;
        let body_b = self.record(b)?.handle;
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(anchor_a.to_point())
            .local_anchor2(anchor_b.to_point())
            .contacts_enabled(false);
        let handle = self.impulse_joints.insert(body_a, body_b, joint, true);
        Ok(JointHandle(handle))
    }

    /// Applies `force`, given in body space, at `point`, also in body space.
    /// The force stays applied until the end of the next [`World::step`].
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn apply_force_at_local_point(
        &mut self,
        body: BodyHandle,
        force: Vec2,
        point: Vec2,
    ) -> Result<(), PhysicsError> {
        let rb = self.rigid_body_mut(body)?;
        let pose = *rb.position();
        let world_force = pose.rotation * force.to_vector();
        let world_point = pose * point.to_point();
        rb.add_force_at_point(world_force, world_point, true);
        Ok(())
    }

    /// Integrates the body's velocity once without gravity:
    /// `v = v * damping + F / m * dt` and `w = w * damping + T / I * dt`,
    /// where `F` and `T` are the user force and torque currently applied.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn update_velocity(&mut self, body: BodyHandle, damping: f32) -> Result<(), PhysicsError> {
        let record = self.record(body)?;
        if record.kind == BodyKind::Static {
            return Ok(());
        }
        let (inv_mass, inv_moment) = (1.0 / record.mass, 1.0 / record.moment);
        let dt = self.params.dt;
        let rb = self.rigid_body_mut(body)?;
        let linvel = *rb.linvel() * damping + rb.user_force() * (inv_mass * dt);
        let angvel = rb.angvel() * damping + rb.user_torque() * (inv_moment * dt);
        rb.set_linvel(linvel, true);
        rb.set_angvel(angvel, true);
        Ok(())
    }

    /// Advances the simulation by one timestep and clears all user forces.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            &(),
        );
        for (_, rb) in self.bodies.iter_mut() {
            rb.reset_forces(false);
            rb.reset_torques(false);
        }
    }

    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn body_state(&self, body: BodyHandle) -> Result<BodyState, PhysicsError> {
        let rb = self.rigid_body(body)?;
        Ok(BodyState {
            position: (*rb.translation()).into(),
            angle: rb.rotation().angle(),
            velocity: (*rb.linvel()).into(),
            angular_velocity: rb.angvel(),
        })
    }

    /// Teleports a body. Mostly useful to put a scene into a known state.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn set_body_state(&mut self, body: BodyHandle, state: BodyState) -> Result<(), PhysicsError> {
        let rb = self.rigid_body_mut(body)?;
        rb.set_translation(state.position.to_vector(), true);
        rb.set_rotation(rapier2d::prelude::Rotation::new(state.angle), true);
        rb.set_linvel(state.velocity.to_vector(), true);
        rb.set_angvel(state.angular_velocity, true);
        Ok(())
    }

    /// Maps a body-space point into world space.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn local_to_world(&self, body: BodyHandle, point: Vec2) -> Result<Vec2, PhysicsError> {
        let rb = self.rigid_body(body)?;
        Ok((rb.position() * point.to_point()).into())
    }

    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn shape(&self, body: BodyHandle) -> Result<Shape, PhysicsError> {
        Ok(self.record(body)?.shape)
    }

    /// The body's shape transformed into world space.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::UnknownBody`] for unknown handles.
    pub fn outline(&self, body: BodyHandle) -> Result<Outline, PhysicsError> {
        let outline = match self.shape(body)? {
            Shape::Box { width, height } => {
                let (hw, hh) = (width * 0.5, height * 0.5);
                let corners = [
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                ];
                Outline::Polygon(
                    corners
                        .iter()
                        .map(|c| self.local_to_world(body, *c))
                        .collect::<Result<_, _>>()?,
                )
            }
            Shape::Segment { a, b, radius } => Outline::Segment {
                a: self.local_to_world(body, a)?,
                b: self.local_to_world(body, b)?,
                radius,
            },
        };
        Ok(outline)
    }

    fn record(&self, body: BodyHandle) -> Result<&BodyRecord, PhysicsError> {
        self.records
            .get(body.0)
            .ok_or(PhysicsError::UnknownBody(body.0))
    }

    fn rigid_body(&self, body: BodyHandle) -> Result<&RigidBody, PhysicsError> {
        let handle = self.record(body)?.handle;
        self.bodies
            .get(handle)
            .ok_or(PhysicsError::UnknownBody(body.0))
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Result<&mut RigidBody, PhysicsError> {
        let handle = self.record(body)?.handle;
        self.bodies
            .get_mut(handle)
            .ok_or(PhysicsError::UnknownBody(body.0))
    }
}
