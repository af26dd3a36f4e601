use rapier2d::prelude::{Point, Real, Vector};
use serde::{Deserialize, Serialize};

/// Plain 2D vector used at the crate boundary so callers never need to
/// depend on the engine's linear algebra types.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians from +x.
    #[must_use]
    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Angle of this vector measured from the +x axis, in radians.
    #[must_use]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub(crate) fn to_vector(self) -> Vector<Real> {
        Vector::new(self.x, self.y)
    }

    pub(crate) fn to_point(self) -> Point<Real> {
        Point::new(self.x, self.y)
    }
}

impl From<Vector<Real>> for Vec2 {
    fn from(v: Vector<Real>) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Point<Real>> for Vec2 {
    fn from(p: Point<Real>) -> Self {
        Self::new(p.x, p.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Kinematic state of one rigid body as reported by the engine.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    /// Rotation in radians, counter-clockwise from +x.
    pub angle: f32,
    pub velocity: Vec2,
    pub angular_velocity: f32,
}

/// Collision shape attached to a body. All shapes are sensors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    /// Axis-aligned box in body space, given by its full width and height.
    Box { width: f32, height: f32 },
    /// Line segment in body space with a radius (zero for a bare line).
    Segment { a: Vec2, b: Vec2, radius: f32 },
}

impl Shape {
    /// Moment of inertia about the body origin for a uniform body of `mass`.
    #[must_use]
    pub fn moment(&self, mass: f32) -> f32 {
        match *self {
            Shape::Box { width, height } => mass * (width * width + height * height) / 12.0,
            Shape::Segment { a, b, .. } => {
                let len = (b - a).length();
                let mid = (a + b) * 0.5;
                mass * (len * len / 12.0 + mid.x * mid.x + mid.y * mid.y)
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Dynamic,
    Static,
}

/// Everything needed to insert a body into a [`crate::World`].
#[derive(Clone, Debug)]
pub struct BodySpec {
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    /// Ignored for static bodies.
    pub mass: f32,
    pub shape: Shape,
}

impl BodySpec {
    #[must_use]
    pub fn dynamic(position: Vec2, angle: f32, mass: f32, shape: Shape) -> Self {
        Self { kind: BodyKind::Dynamic, position, angle, mass, shape }
    }

    #[must_use]
    pub fn fixed(shape: Shape) -> Self {
        Self { kind: BodyKind::Static, position: Vec2::ZERO, angle: 0.0, mass: 0.0, shape }
    }
}
