use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::collider::{Collider, ColliderShape};
use crate::physics::collision_detection::contact_manifold::ContactManifold;

use super::box_pair_tester::BoxPairTester;
use super::capsule_pair_tester::CapsulePairTester;
use super::convex_pair_tester::ConvexPairTester;
use super::sphere_capsule_tester::SphereCapsuleTester;
use super::sphere_pair_tester::SpherePairTester;

/// Picks the pair tester for two convex colliders.
pub struct ConvexCollisionTask;

impl ConvexCollisionTask {
    /// Contact manifold between two convex colliders placed in world space, or `None` if they are farther apart
    /// than `speculative_margin` or either collider is not convex. The normal points from B to A.
    pub fn collide(
        a: &Collider,
        pose_a: &RigidPose,
        b: &Collider,
        pose_b: &RigidPose,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        match (a.shape(), b.shape()) {
            (ColliderShape::Sphere(sa), ColliderShape::Sphere(sb)) => {
                SpherePairTester::test(sa, pose_a, sb, pose_b, speculative_margin)
            }
            (ColliderShape::Sphere(sa), ColliderShape::Capsule(cb)) => {
                SphereCapsuleTester::test(sa, pose_a, cb, pose_b, speculative_margin)
            }
            (ColliderShape::Capsule(ca), ColliderShape::Sphere(sb)) => {
                SphereCapsuleTester::test(sb, pose_b, ca, pose_a, speculative_margin).map(|m| m.flipped())
            }
            (ColliderShape::Capsule(ca), ColliderShape::Capsule(cb)) => {
                CapsulePairTester::test(ca, pose_a, cb, pose_b, speculative_margin)
            }
            (ColliderShape::Box(ba), ColliderShape::Box(bb)) => {
                BoxPairTester::test(ba, pose_a, bb, pose_b, speculative_margin)
            }
            _ => {
                let convex_a = a.as_convex()?;
                let convex_b = b.as_convex()?;
                ConvexPairTester::test(convex_a, pose_a, convex_b, pose_b, speculative_margin)
            }
        }
    }
}
