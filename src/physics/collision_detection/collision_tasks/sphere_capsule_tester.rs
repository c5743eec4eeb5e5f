use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::capsule::Capsule;
use crate::physics::collidables::sphere::Sphere;
use crate::physics::collision_detection::contact_manifold::ContactManifold;

use super::capsule_pair_tester::closest_point_on_segment;
use super::sphere_pair_tester::SpherePairTester;

/// Pair tester for a sphere (A) against a capsule (B).
pub struct SphereCapsuleTester;

impl SphereCapsuleTester {
    pub fn test(
        a: &Sphere,
        pose_a: &RigidPose,
        b: &Capsule,
        pose_b: &RigidPose,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        let center = pose_a.transform_point(a.center);
        let closest = closest_point_on_segment(
            center,
            pose_b.transform_point(b.vertex0),
            pose_b.transform_point(b.vertex1),
        );
        SpherePairTester::test_points(center, a.radius, closest, b.radius, speculative_margin)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn sphere_on_capsule_side() {
        let sphere = Sphere::new(Vec3::ZERO, 0.5);
        let capsule = Capsule::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.25);
        let manifold = SphereCapsuleTester::test(
            &sphere,
            &RigidPose::from_position(Vec3::new(0.5, 0.7, 0.0)),
            &capsule,
            &RigidPose::IDENTITY,
            0.0,
        )
        .unwrap();
        assert!(manifold.normal.abs_diff_eq(Vec3::Y, 1e-6));
        let contact = manifold.points()[0];
        assert!((contact.depth - 0.05).abs() < 1e-5);
        assert!(contact.position.abs_diff_eq(Vec3::new(0.5, 0.25, 0.0), 1e-6));
    }
}
