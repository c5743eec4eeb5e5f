use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::sphere::Sphere;
use crate::physics::collision_detection::contact_manifold::{ContactManifold, ContactPoint};

/// Pair tester for sphere vs sphere collisions.
pub struct SpherePairTester;

impl SpherePairTester {
    pub fn test(
        a: &Sphere,
        pose_a: &RigidPose,
        b: &Sphere,
        pose_b: &RigidPose,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        Self::test_points(
            pose_a.transform_point(a.center),
            a.radius,
            pose_b.transform_point(b.center),
            b.radius,
            speculative_margin,
        )
    }

    /// Contact between two rounded points; every rounded core pair reduces to this once its closest points are
    /// known.
    pub(crate) fn test_points(
        center_a: Vec3,
        radius_a: f32,
        center_b: Vec3,
        radius_b: f32,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        let offset = center_a - center_b;
        let distance = offset.length();
        // By convention the normal points from B to A. Coincident centers pick +Y.
        let normal = if distance > 0.0 { offset / distance } else { Vec3::Y };
        let depth = radius_a + radius_b - distance;
        if depth < -speculative_margin {
            return None;
        }
        let mut manifold = ContactManifold::new(normal);
        manifold.push(ContactPoint {
            position: center_b + normal * radius_b,
            depth,
        });
        Some(manifold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_spheres() {
        let a = Sphere::new(Vec3::ZERO, 1.0);
        let b = Sphere::new(Vec3::ZERO, 0.5);
        let manifold = SpherePairTester::test(
            &a,
            &RigidPose::from_position(Vec3::new(0.0, 1.25, 0.0)),
            &b,
            &RigidPose::IDENTITY,
            0.0,
        )
        .unwrap();
        assert_eq!(manifold.normal, Vec3::Y);
        assert_eq!(manifold.count(), 1);
        let contact = manifold.points()[0];
        assert!((contact.depth - 0.25).abs() < 1e-6);
        assert!(contact.position.abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-6));
    }

    #[test]
    fn speculative_margin_bounds_separation() {
        let sphere = Sphere::new(Vec3::ZERO, 0.5);
        let far = RigidPose::from_position(Vec3::new(1.2, 0.0, 0.0));
        assert!(SpherePairTester::test(&sphere, &far, &sphere, &RigidPose::IDENTITY, 0.1).is_none());
        let manifold = SpherePairTester::test(&sphere, &far, &sphere, &RigidPose::IDENTITY, 0.25).unwrap();
        assert!((manifold.points()[0].depth + 0.2).abs() < 1e-6);
    }
}
