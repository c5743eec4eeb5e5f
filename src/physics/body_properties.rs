use glam::{Quat, Vec3};
use std::fmt;
use std::ops::Mul;

use crate::physics::collidables::collider::ColliderBlob;
use crate::physics::collidables::mass_properties::MassProperties;

/// Represents a rigid transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidPose {
    /// Orientation of the pose.
    pub orientation: Quat,
    /// Position of the pose.
    pub position: Vec3,
}

impl Default for RigidPose {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    /// Returns a pose with a position at (0,0,0) and identity orientation.
    pub const IDENTITY: Self = Self {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    /// Creates a rigid pose with the given position and orientation.
    #[inline(always)]
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// Creates a rigid pose with the given position and identity orientation.
    #[inline(always)]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Transforms a point by the rigid pose: orientation * v + position.
    #[inline(always)]
    pub fn transform_point(&self, v: Vec3) -> Vec3 {
        self.orientation * v + self.position
    }

    /// Rotates a direction by the pose's orientation.
    #[inline(always)]
    pub fn transform_direction(&self, v: Vec3) -> Vec3 {
        self.orientation * v
    }

    /// Transforms a point by the inverse of the pose: orientation^-1 * (v - position).
    #[inline(always)]
    pub fn transform_point_by_inverse(&self, v: Vec3) -> Vec3 {
        self.orientation.conjugate() * (v - self.position)
    }

    /// Inverts the rigid transformation of the pose.
    #[inline(always)]
    pub fn inverse(&self) -> Self {
        let orientation = self.orientation.conjugate();
        Self {
            orientation,
            position: orientation * -self.position,
        }
    }
}

/// `a * b` applies `b` first, then `a`; `world_from_motion * motion_from_body` yields `world_from_body`.
impl Mul for RigidPose {
    type Output = RigidPose;

    #[inline(always)]
    fn mul(self, rhs: RigidPose) -> RigidPose {
        RigidPose {
            orientation: (self.orientation * rhs.orientation).normalize(),
            position: self.orientation * rhs.position + self.position,
        }
    }
}

impl From<Vec3> for RigidPose {
    fn from(position: Vec3) -> Self {
        Self::from_position(position)
    }
}

impl fmt::Display for RigidPose {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}, {}", self.position, self.orientation)
    }
}

/// A body in the collision world. Dynamic bodies occupy the lowest indices; everything at or above
/// `num_dynamic_bodies` is static and never moves.
#[derive(Debug, Clone, Default)]
pub struct RigidBody {
    /// Shape of the body. Bodies without a collider never generate pairs.
    pub collider: Option<ColliderBlob>,
    pub world_from_body: RigidPose,
    /// Arbitrary user bits carried into events.
    pub custom_tags: u8,
}

impl RigidBody {
    pub fn new(collider: Option<ColliderBlob>, world_from_body: RigidPose) -> Self {
        Self {
            collider,
            world_from_body,
            custom_tags: 0,
        }
    }
}

/// Per dynamic body transform state. The motion space is centered on the center of mass and aligned with the
/// principal axes of inertia.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionData {
    pub world_from_motion: RigidPose,
    pub body_from_motion: RigidPose,
    /// Fraction of linear velocity removed per second.
    pub linear_damping: f32,
    /// Fraction of angular velocity removed per second.
    pub angular_damping: f32,
}

impl Default for MotionData {
    fn default() -> Self {
        Self {
            world_from_motion: RigidPose::IDENTITY,
            body_from_motion: RigidPose::IDENTITY,
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl MotionData {
    /// Places the motion frame of a body whose mass distribution is known in body space.
    pub fn from_body(world_from_body: RigidPose, mass_properties: &MassProperties) -> Self {
        let body_from_motion = mass_properties.mass_distribution.transform;
        Self {
            world_from_motion: world_from_body * body_from_motion,
            body_from_motion,
            ..Self::default()
        }
    }

    #[inline(always)]
    pub fn world_from_body(&self) -> RigidPose {
        self.world_from_motion * self.body_from_motion.inverse()
    }
}

/// Velocity and inverse mass data of a dynamic body; the only state the solver mutates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionVelocity {
    /// World space linear velocity of the center of mass.
    pub linear_velocity: Vec3,
    /// Angular velocity in motion space.
    pub angular_velocity: Vec3,
    /// Diagonal inverse inertia in motion space.
    pub inverse_inertia: Vec3,
    pub inverse_mass: f32,
    /// Largest distance from the center of mass to the collider surface; scales the angular bounds expansion.
    pub angular_expansion_factor: f32,
    pub gravity_factor: f32,
}

impl Default for MotionVelocity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl MotionVelocity {
    /// Motionless infinite mass. Static bodies read as this.
    pub const ZERO: Self = Self {
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
        inverse_inertia: Vec3::ZERO,
        inverse_mass: 0.0,
        angular_expansion_factor: 0.0,
        gravity_factor: 0.0,
    };

    /// Velocity record for a body of the given mass.
    pub fn from_mass(mass_properties: &MassProperties, mass: f32) -> Self {
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        let inertia = mass_properties.mass_distribution.inertia_tensor * mass;
        let inverse_inertia = Vec3::select(inertia.cmpgt(Vec3::ZERO), inertia.recip(), Vec3::ZERO);
        Self {
            inverse_inertia,
            inverse_mass,
            angular_expansion_factor: mass_properties.angular_expansion_factor,
            gravity_factor: 1.0,
            ..Self::ZERO
        }
    }

    #[inline(always)]
    pub fn has_infinite_mass(&self) -> bool {
        self.inverse_mass == 0.0
    }

    #[inline(always)]
    pub fn has_infinite_inertia(&self) -> bool {
        self.inverse_inertia == Vec3::ZERO
    }

    #[inline(always)]
    pub fn is_kinematic(&self) -> bool {
        self.has_infinite_mass() && self.has_infinite_inertia()
    }

    #[inline(always)]
    pub fn apply_linear_impulse(&mut self, impulse: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass;
    }

    /// Applies an angular impulse expressed in motion space.
    #[inline(always)]
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        self.angular_velocity += impulse * self.inverse_inertia;
    }

    /// Predicted growth of the body's bounds over a step: the linear displacement plus a uniform margin
    /// covering the rotation.
    pub fn calculate_expansion(&self, timestep: f32) -> MotionExpansion {
        MotionExpansion {
            linear: self.linear_velocity * timestep,
            uniform: (self.angular_velocity.length() * timestep).min(std::f32::consts::FRAC_PI_2)
                * self.angular_expansion_factor,
        }
    }
}

/// Bounds growth of a moving body over one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionExpansion {
    pub linear: Vec3,
    pub uniform: f32,
}
