use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::collidables::box_shape::BoxShape;
use crate::physics::collision_detection::contact_manifold::{ContactManifold, ContactPoint};

use super::capsule_pair_tester::closest_segment_parameters;
use super::manifold_candidate_helper::ManifoldCandidateHelper;

/// B's face axes must beat A's by this much to be picked.
const FACE_TOLERANCE: f32 = 1e-4;
/// Edge axes must beat face axes by this much to be picked.
const EDGE_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy)]
struct OrientedBox {
    center: Vec3,
    axes: [Vec3; 3],
    half_extents: [f32; 3],
}

impl OrientedBox {
    fn new(shape: &BoxShape, pose: &RigidPose) -> Self {
        let frame = *pose * shape.local_pose();
        Self {
            center: frame.position,
            axes: Vec3::AXES.map(|axis| frame.orientation * axis),
            half_extents: shape.half_extents.to_array(),
        }
    }

    #[inline(always)]
    fn projected_radius(&self, axis: Vec3) -> f32 {
        (0..3).map(|i| self.half_extents[i] * self.axes[i].dot(axis).abs()).sum()
    }

    /// Corners of the face whose outward normal is `sign * axes[axis]`.
    fn face(&self, axis: usize, sign: f32) -> [Vec3; 4] {
        let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
        let center = self.center + self.axes[axis] * (sign * self.half_extents[axis]);
        let du = self.axes[u] * self.half_extents[u];
        let dv = self.axes[v] * self.half_extents[v];
        [center + du + dv, center - du + dv, center - du - dv, center + du - dv]
    }

    /// Outward sign of the face on `axis` facing `direction`.
    #[inline(always)]
    fn face_sign(&self, axis: usize, direction: Vec3) -> f32 {
        if self.axes[axis].dot(direction) < 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    /// Index and outward sign of the face most aligned with `direction`.
    fn face_along(&self, direction: Vec3) -> (usize, f32) {
        let mut best = (0, 1.0);
        let mut best_alignment = f32::NEG_INFINITY;
        for (i, axis) in self.axes.iter().enumerate() {
            let alignment = axis.dot(direction);
            if alignment.abs() > best_alignment {
                best_alignment = alignment.abs();
                best = (i, self.face_sign(i, direction));
            }
        }
        best
    }

    /// Edge parallel to `axes[axis]` that is extreme along `direction`.
    fn edge_along(&self, axis: usize, direction: Vec3) -> (Vec3, Vec3) {
        let mut midpoint = self.center;
        for i in 0..3 {
            if i != axis {
                midpoint += self.axes[i] * (self.face_sign(i, direction) * self.half_extents[i]);
            }
        }
        let half = self.axes[axis] * self.half_extents[axis];
        (midpoint - half, midpoint + half)
    }
}

#[derive(Debug, Clone, Copy)]
enum SeparatingAxis {
    FaceA(usize),
    FaceB(usize),
    Edges(usize, usize),
}

/// Pair tester for box vs box collisions using the separating axis test, then clipping the incident face against
/// the reference face.
pub struct BoxPairTester;

impl BoxPairTester {
    pub fn test(
        a: &BoxShape,
        pose_a: &RigidPose,
        b: &BoxShape,
        pose_b: &RigidPose,
        speculative_margin: f32,
    ) -> Option<ContactManifold> {
        let box_a = OrientedBox::new(a, pose_a);
        let box_b = OrientedBox::new(b, pose_b);
        let offset = box_a.center - box_b.center;

        let mut best_axis = SeparatingAxis::FaceA(0);
        let mut best_direction = box_a.axes[0];
        let mut best_separation = f32::NEG_INFINITY;
        for i in 0..3 {
            let axis = box_a.axes[i];
            let separation = offset.dot(axis).abs() - box_a.half_extents[i] - box_b.projected_radius(axis);
            if separation > best_separation {
                best_separation = separation;
                best_axis = SeparatingAxis::FaceA(i);
                best_direction = axis;
            }
        }
        for i in 0..3 {
            let axis = box_b.axes[i];
            let separation = offset.dot(axis).abs() - box_a.projected_radius(axis) - box_b.half_extents[i];
            if separation > best_separation + FACE_TOLERANCE {
                best_separation = separation;
                best_axis = SeparatingAxis::FaceB(i);
                best_direction = axis;
            }
        }
        for i in 0..3 {
            for j in 0..3 {
                let Some(axis) = box_a.axes[i].cross(box_b.axes[j]).try_normalize() else {
                    continue;
                };
                let separation = offset.dot(axis).abs() - box_a.projected_radius(axis) - box_b.projected_radius(axis);
                if separation > best_separation + EDGE_TOLERANCE {
                    best_separation = separation;
                    best_axis = SeparatingAxis::Edges(i, j);
                    best_direction = axis;
                }
            }
        }
        if best_separation > speculative_margin {
            return None;
        }
        // By convention, the normal points from B to A.
        let normal = if offset.dot(best_direction) < 0.0 { -best_direction } else { best_direction };

        let manifold = match best_axis {
            SeparatingAxis::FaceA(i) => {
                let reference = box_a.face(i, box_a.face_sign(i, -normal));
                let (k, sign) = box_b.face_along(normal);
                ManifoldCandidateHelper::create_manifold(
                    &reference,
                    0.0,
                    &box_b.face(k, sign),
                    0.0,
                    normal,
                    speculative_margin,
                )
            }
            SeparatingAxis::FaceB(i) => {
                // Equal point counts make the first face the reference, so clip with the roles swapped.
                let reference = box_b.face(i, box_b.face_sign(i, normal));
                let (k, sign) = box_a.face_along(-normal);
                ManifoldCandidateHelper::create_manifold(
                    &reference,
                    0.0,
                    &box_a.face(k, sign),
                    0.0,
                    -normal,
                    speculative_margin,
                )
                .flipped()
            }
            SeparatingAxis::Edges(i, j) => {
                let (a0, a1) = box_a.edge_along(i, -normal);
                let (b0, b1) = box_b.edge_along(j, normal);
                let (s, t) = closest_segment_parameters(a0, a1, b0, b1);
                let point_a = a0 + (a1 - a0) * s;
                let point_b = b0 + (b1 - b0) * t;
                let mut manifold = ContactManifold::new(normal);
                manifold.push(ContactPoint {
                    position: point_b,
                    depth: -(point_a - point_b).dot(normal),
                });
                manifold
            }
        };
        (!manifold.is_empty()).then_some(manifold)
    }
}
