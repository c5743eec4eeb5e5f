use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::shape::ConvexShape;
use crate::physics::collision_detection::contact_manifold::{ContactManifold, ContactPoint};
use crate::physics::collision_detection::depth_refiner::{DepthRefiner, GjkResult};
use crate::physics::collision_detection::support_finder::SupportFinder;

use super::manifold_candidate_helper::ManifoldCandidateHelper;

/// Pair tester for any two convex shapes.
///
/// GJK finds the closest points of the cores; EPA refines the normal when the cores overlap. The support features
/// of both shapes along that normal are then clipped against each other to build a multi point manifold. When
/// neither feature is a face, the single closest pair is used.
pub struct ConvexPairTester;

impl ConvexPairTester {
    pub fn test(
        a: &dyn ConvexShape,
        pose_a: &RigidPose,
        b: &dyn ConvexShape,
        pose_b: &RigidPose,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        let radius_a = a.convex_radius();
        let radius_b = b.convex_radius();
        let finder = SupportFinder::new(a, pose_a, b, pose_b);

        let (normal, depth, point_b) = match DepthRefiner::closest_points(&finder) {
            GjkResult::Separated { point_a, point_b } => {
                let offset = point_a - point_b;
                let distance = offset.length();
                let depth = radius_a + radius_b - distance;
                if depth < -speculative_margin {
                    return None;
                }
                let normal = if distance > 0.0 {
                    offset / distance
                } else {
                    finder.interior_point().try_normalize().unwrap_or(Vec3::Y)
                };
                (normal, depth, point_b)
            }
            GjkResult::Overlapping(simplex) => match DepthRefiner::penetration(&finder, &simplex) {
                Some(penetration) => (-penetration.normal, penetration.depth + radius_a + radius_b, penetration.point_b),
                None => {
                    // Flat Minkowski difference; the cores only touch.
                    let normal = finder.interior_point().try_normalize().unwrap_or(Vec3::Y);
                    (normal, radius_a + radius_b, simplex.witness_points().1)
                }
            },
        };

        let mut face_a = Vec::with_capacity(8);
        let mut face_b = Vec::with_capacity(8);
        a.world_support_face(pose_a, -normal, &mut face_a);
        b.world_support_face(pose_b, normal, &mut face_b);
        let manifold =
            ManifoldCandidateHelper::create_manifold(&face_a, radius_a, &face_b, radius_b, normal, speculative_margin);
        if !manifold.is_empty() {
            return Some(manifold);
        }

        let mut manifold = ContactManifold::new(normal);
        manifold.push(ContactPoint {
            position: point_b + normal * radius_b,
            depth,
        });
        Some(manifold)
    }
}
