use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::{support_feature, ConvexShape};

/// Collision shape representing a sphere-expanded line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub vertex0: Vec3,
    pub vertex1: Vec3,
    /// Spherical expansion applied to the internal line segment.
    pub radius: f32,
}

impl Capsule {
    /// Creates a capsule shape.
    #[inline(always)]
    pub fn new(vertex0: Vec3, vertex1: Vec3, radius: f32) -> Self {
        Self {
            vertex0,
            vertex1,
            radius,
        }
    }

    /// Gets the length of the capsule's internal line segment.
    #[inline(always)]
    pub fn length(&self) -> f32 {
        (self.vertex1 - self.vertex0).length()
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.vertex0.is_finite()
            && self.vertex1.is_finite()
            && self.radius.is_finite()
            && self.radius >= 0.0
    }
}

impl ConvexShape for Capsule {
    #[inline(always)]
    fn support(&self, direction: Vec3) -> Vec3 {
        if direction.dot(self.vertex1 - self.vertex0) > 0.0 {
            self.vertex1
        } else {
            self.vertex0
        }
    }

    fn support_face(&self, direction: Vec3, face: &mut Vec<Vec3>) {
        support_feature(&[self.vertex0, self.vertex1], direction, face);
    }

    #[inline(always)]
    fn convex_radius(&self) -> f32 {
        self.radius
    }

    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        let a = pose.transform_point(self.vertex0);
        let b = pose.transform_point(self.vertex1);
        BoundingBox::new(a.min(b), a.max(b)).expanded(self.radius)
    }

    fn compute_mass_properties(&self) -> MassProperties {
        MassProperties::from_capsule(self.vertex0, self.vertex1, self.radius)
    }

    #[inline(always)]
    fn core_center(&self) -> Vec3 {
        (self.vertex0 + self.vertex1) * 0.5
    }
}
