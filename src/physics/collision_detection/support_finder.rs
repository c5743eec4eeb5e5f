use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::shape::ConvexShape;

/// Support point of the Minkowski difference `A - B`, with the core points of A and B it was built from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SupportVertex {
    pub w: Vec3,
    pub a: Vec3,
    pub b: Vec3,
}

/// Samples the Minkowski difference of two posed convex cores in world space.
#[derive(Clone, Copy)]
pub struct SupportFinder<'a> {
    shape_a: &'a dyn ConvexShape,
    pose_a: &'a RigidPose,
    shape_b: &'a dyn ConvexShape,
    pose_b: &'a RigidPose,
}

impl<'a> SupportFinder<'a> {
    pub fn new(
        shape_a: &'a dyn ConvexShape,
        pose_a: &'a RigidPose,
        shape_b: &'a dyn ConvexShape,
        pose_b: &'a RigidPose,
    ) -> Self {
        Self {
            shape_a,
            pose_a,
            shape_b,
            pose_b,
        }
    }

    #[inline(always)]
    pub fn support(&self, direction: Vec3) -> SupportVertex {
        let a = self.shape_a.world_support(self.pose_a, direction);
        let b = self.shape_b.world_support(self.pose_b, -direction);
        SupportVertex { w: a - b, a, b }
    }

    /// A point inside the Minkowski difference.
    #[inline(always)]
    pub fn interior_point(&self) -> Vec3 {
        self.pose_a.transform_point(self.shape_a.core_center()) - self.pose_b.transform_point(self.shape_b.core_center())
    }
}
