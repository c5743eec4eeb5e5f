use glam::Vec3;

use crate::physics::collision_detection::contact_manifold::{ContactManifold, ContactPoint};

/// Squared distance under which two clipped points are treated as the same candidate.
const DUPLICATE_DISTANCE_SQUARED: f32 = 1e-10;

/// Builds multi point manifolds by clipping one support feature against another.
pub struct ManifoldCandidateHelper;

impl ManifoldCandidateHelper {
    /// Clips a convex polygon against the half space `point · plane_normal <= plane_offset`, writing the result to
    /// `output`. Points and segments are valid polygons.
    pub fn clip_polygon(input: &[Vec3], plane_normal: Vec3, plane_offset: f32, output: &mut Vec<Vec3>) {
        output.clear();
        let Some(&last) = input.last() else {
            return;
        };
        let mut previous = last;
        let mut previous_distance = previous.dot(plane_normal) - plane_offset;
        for &current in input {
            let distance = current.dot(plane_normal) - plane_offset;
            if distance <= 0.0 {
                if previous_distance > 0.0 {
                    output.push(previous + (current - previous) * (previous_distance / (previous_distance - distance)));
                }
                output.push(current);
            } else if previous_distance <= 0.0 {
                output.push(previous + (current - previous) * (previous_distance / (previous_distance - distance)));
            }
            previous = current;
            previous_distance = distance;
        }
        Self::remove_duplicates(output);
    }

    fn remove_duplicates(points: &mut Vec<Vec3>) {
        let mut write = 0;
        for read in 0..points.len() {
            let point = points[read];
            if points[..write].iter().all(|kept| kept.distance_squared(point) > DUPLICATE_DISTANCE_SQUARED) {
                points[write] = point;
                write += 1;
            }
        }
        points.truncate(write);
    }

    /// Replaces `points` with their convex outline in counter clockwise order around `normal`. Collinear sets
    /// collapse to their two extreme points.
    pub fn order_face(points: &mut Vec<Vec3>, normal: Vec3) {
        Self::remove_duplicates(points);
        if points.len() < 3 {
            return;
        }
        let x_axis = normal.any_orthonormal_vector();
        let y_axis = normal.cross(x_axis);
        let mut projected: Vec<(f32, f32, Vec3)> = points.iter().map(|&p| (p.dot(x_axis), p.dot(y_axis), p)).collect();
        projected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

        let turn = |o: &(f32, f32, Vec3), a: &(f32, f32, Vec3), b: &(f32, f32, Vec3)| {
            (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
        };
        // Monotone chain; lower then upper hull.
        let mut hull: Vec<(f32, f32, Vec3)> = Vec::with_capacity(projected.len() * 2);
        for point in projected.iter() {
            while hull.len() >= 2 && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], point) <= 1e-9 {
                hull.pop();
            }
            hull.push(*point);
        }
        let lower_length = hull.len() + 1;
        for point in projected.iter().rev().skip(1) {
            while hull.len() >= lower_length && turn(&hull[hull.len() - 2], &hull[hull.len() - 1], point) <= 1e-9 {
                hull.pop();
            }
            hull.push(*point);
        }
        hull.pop();

        points.clear();
        points.extend(hull.iter().map(|entry| entry.2));
    }

    /// Creates a manifold from the support feature of A along `-normal` and of B along `normal`, both holding core
    /// points in world space. The feature with more points is the reference; the other is clipped against its
    /// side planes. Returns an empty manifold when neither feature is a face or clipping removes every point.
    pub fn create_manifold(
        face_a: &[Vec3],
        radius_a: f32,
        face_b: &[Vec3],
        radius_b: f32,
        normal: Vec3,
        speculative_margin: f32,
    ) -> ContactManifold {
        let reference_is_a = face_a.len() >= face_b.len();
        let (reference, incident) = if reference_is_a { (face_a, face_b) } else { (face_b, face_a) };
        if reference.len() < 3 {
            return ContactManifold::new(normal);
        }

        let mut reference_polygon = reference.to_vec();
        Self::order_face(&mut reference_polygon, normal);
        if reference_polygon.len() < 3 {
            return ContactManifold::new(normal);
        }
        let mut clipped = incident.to_vec();
        Self::order_face(&mut clipped, normal);
        let mut scratch = Vec::with_capacity(clipped.len() + reference_polygon.len());
        for (index, &start) in reference_polygon.iter().enumerate() {
            let end = reference_polygon[(index + 1) % reference_polygon.len()];
            let inward = normal.cross(end - start);
            Self::clip_polygon(&clipped, -inward, -start.dot(inward), &mut scratch);
            std::mem::swap(&mut clipped, &mut scratch);
            if clipped.is_empty() {
                return ContactManifold::new(normal);
            }
        }

        let reference_offset =
            reference_polygon.iter().map(|point| point.dot(normal)).sum::<f32>() / reference_polygon.len() as f32;
        let candidates: Vec<ContactPoint> = clipped
            .iter()
            .map(|&point| {
                let height = point.dot(normal) - reference_offset;
                if reference_is_a {
                    // Incident points are on B's core.
                    ContactPoint {
                        position: point + normal * radius_b,
                        depth: height + radius_a + radius_b,
                    }
                } else {
                    // Incident points are on A's core; project them onto B's face.
                    ContactPoint {
                        position: point - normal * height + normal * radius_b,
                        depth: radius_a + radius_b - height,
                    }
                }
            })
            .collect();
        ContactManifold::reduce(normal, &candidates, speculative_margin)
    }
}
