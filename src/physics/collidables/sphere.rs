use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::ConvexShape;

/// Collision shape representing a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center of the sphere in collider space.
    pub center: Vec3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Creates a sphere shape.
    #[inline(always)]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite() && self.radius >= 0.0
    }
}

impl ConvexShape for Sphere {
    #[inline(always)]
    fn support(&self, _direction: Vec3) -> Vec3 {
        self.center
    }

    #[inline(always)]
    fn convex_radius(&self) -> f32 {
        self.radius
    }

    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        BoundingBox::from_center_half_extents(pose.transform_point(self.center), Vec3::splat(self.radius))
    }

    fn compute_mass_properties(&self) -> MassProperties {
        MassProperties::from_sphere(self.center, self.radius)
    }

    #[inline(always)]
    fn core_center(&self) -> Vec3 {
        self.center
    }
}
