use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::{bounds_of_points, support_feature, support_index, ConvexShape};

/// Triangle collision shape. Meshes expose their faces as triangles to the convex collision tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    /// Creates a triangle shape.
    #[inline(always)]
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Unnormalized face normal following the a, b, c winding.
    #[inline(always)]
    pub fn face_normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a)
    }

    #[inline(always)]
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }
}

impl ConvexShape for Triangle {
    #[inline(always)]
    fn support(&self, direction: Vec3) -> Vec3 {
        let vertices = self.vertices();
        vertices[support_index(&vertices, direction)]
    }

    fn support_face(&self, direction: Vec3, face: &mut Vec<Vec3>) {
        support_feature(&self.vertices(), direction, face);
    }

    #[inline(always)]
    fn convex_radius(&self) -> f32 {
        0.0
    }

    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        bounds_of_points(&self.vertices(), pose)
    }

    /// Triangles have no volume; the result only centers the distribution on the centroid.
    fn compute_mass_properties(&self) -> MassProperties {
        let mut properties = MassProperties::default();
        properties.mass_distribution.transform.position = self.core_center();
        properties.volume = 0.0;
        properties
    }

    #[inline(always)]
    fn core_center(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }
}
