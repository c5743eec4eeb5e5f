use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::capsule::Capsule;
use crate::physics::collision_detection::contact_manifold::{ContactManifold, ContactPoint};

/// Segments whose directions are closer than this cosine produce two contacts.
const PARALLEL_THRESHOLD: f32 = 0.995;

/// Closest point to `point` on the segment `start..end`.
#[inline(always)]
pub(crate) fn closest_point_on_segment(point: Vec3, start: Vec3, end: Vec3) -> Vec3 {
    let segment = end - start;
    let length_squared = segment.length_squared();
    if length_squared <= f32::EPSILON {
        return start;
    }
    let t = ((point - start).dot(segment) / length_squared).clamp(0.0, 1.0);
    start + segment * t
}

/// Parameters `(s, t)` of the closest points `a0 + s * (a1 - a0)` and `b0 + t * (b1 - b0)` between two segments.
pub(crate) fn closest_segment_parameters(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> (f32, f32) {
    let da = a1 - a0;
    let db = b1 - b0;
    let r = a0 - b0;
    let a = da.length_squared();
    let e = db.length_squared();
    let f = db.dot(r);
    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (0.0, 0.0);
    }
    if a <= f32::EPSILON {
        return (0.0, (f / e).clamp(0.0, 1.0));
    }
    let c = da.dot(r);
    if e <= f32::EPSILON {
        return ((-c / a).clamp(0.0, 1.0), 0.0);
    }
    let b = da.dot(db);
    let denominator = a * e - b * b;
    let mut s = if denominator > f32::EPSILON * a * e {
        ((b * f - c * e) / denominator).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mut t = (b * s + f) / e;
    if t < 0.0 {
        t = 0.0;
        s = (-c / a).clamp(0.0, 1.0);
    } else if t > 1.0 {
        t = 1.0;
        s = ((b - c) / a).clamp(0.0, 1.0);
    }
    (s, t)
}

/// Pair tester for capsule vs capsule collisions. Nearly parallel capsules get a contact at each end of their
/// overlapping span.
pub struct CapsulePairTester;

impl CapsulePairTester {
    pub fn test(
        a: &Capsule,
        pose_a: &RigidPose,
        b: &Capsule,
        pose_b: &RigidPose,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        let (a0, a1) = (pose_a.transform_point(a.vertex0), pose_a.transform_point(a.vertex1));
        let (b0, b1) = (pose_b.transform_point(b.vertex0), pose_b.transform_point(b.vertex1));
        let (s, t) = closest_segment_parameters(a0, a1, b0, b1);
        let closest_a = a0 + (a1 - a0) * s;
        let closest_b = b0 + (b1 - b0) * t;
        let offset = closest_a - closest_b;
        let distance = offset.length();
        let normal = if distance > 1e-7 {
            offset / distance
        } else {
            // Intersecting cores; push apart perpendicular to both axes, away from B's center.
            let axis = (a1 - a0).cross(b1 - b0);
            let fallback = axis
                .try_normalize()
                .unwrap_or_else(|| (a1 - a0).try_normalize().unwrap_or(Vec3::X).any_orthonormal_vector());
            let centers = (a0 + a1 - b0 - b1) * 0.5;
            if centers.dot(fallback) < 0.0 {
                -fallback
            } else {
                fallback
            }
        };

        let mut manifold = ContactManifold::new(normal);
        let mut add_contact = |core_a: Vec3, core_b: Vec3| {
            let depth = a.radius + b.radius - (core_a - core_b).dot(normal);
            if depth >= -speculative_margin {
                manifold.push(ContactPoint {
                    position: core_b + normal * b.radius,
                    depth,
                });
            }
        };

        let axis_a = (a1 - a0).try_normalize();
        let axis_b = (b1 - b0).try_normalize();
        if let (Some(axis_a), Some(axis_b)) = (axis_a, axis_b) {
            if axis_a.dot(axis_b).abs() > PARALLEL_THRESHOLD {
                let length_a = (a1 - a0).length();
                let tb0 = (b0 - a0).dot(axis_a);
                let tb1 = (b1 - a0).dot(axis_a);
                let low = tb0.min(tb1).max(0.0);
                let high = tb0.max(tb1).min(length_a);
                if high > low + 1e-4 {
                    for along in [low, high] {
                        let core_a = a0 + axis_a * along;
                        add_contact(core_a, closest_point_on_segment(core_a, b0, b1));
                    }
                    return (!manifold.is_empty()).then_some(manifold);
                }
            }
        }
        add_contact(closest_a, closest_b);
        (!manifold.is_empty()).then_some(manifold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossed_capsules_touch_once() {
        let a = Capsule::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.5);
        let b = Capsule::new(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0), 0.5);
        let manifold = CapsulePairTester::test(
            &a,
            &RigidPose::from_position(Vec3::new(0.0, 0.9, 0.0)),
            &b,
            &RigidPose::IDENTITY,
            0.0,
        )
        .unwrap();
        assert_eq!(manifold.count(), 1);
        assert!(manifold.normal.abs_diff_eq(Vec3::Y, 1e-6));
        assert!((manifold.points()[0].depth - 0.1).abs() < 1e-5);
    }

    #[test]
    fn parallel_capsules_touch_twice() {
        let capsule = Capsule::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.5);
        let manifold = CapsulePairTester::test(
            &capsule,
            &RigidPose::from_position(Vec3::new(1.0, 0.95, 0.0)),
            &capsule,
            &RigidPose::IDENTITY,
            0.0,
        )
        .unwrap();
        assert_eq!(manifold.count(), 2);
        for contact in manifold.points() {
            assert!((contact.depth - 0.05).abs() < 1e-5);
        }
        let xs: Vec<f32> = manifold.points().iter().map(|c| c.position.x).collect();
        assert!((xs[0] - 0.0).abs() < 1e-5 && (xs[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn segment_parameters_clamp() {
        let (s, t) = closest_segment_parameters(
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        );
        assert_eq!((s, t), (1.0, 0.0));
    }
}
