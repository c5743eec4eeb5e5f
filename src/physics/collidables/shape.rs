use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;

/// Defines functions available on all convex shapes.
///
/// A convex shape is described as a core plus a uniform radius: a sphere is a point core, a capsule is a
/// segment core. Collision tests operate on cores and account for the radius afterwards.
pub trait ConvexShape {
    /// Farthest point of the core along `direction`, in the shape's local space.
    fn support(&self, direction: Vec3) -> Vec3;

    /// Radius added around the core.
    fn convex_radius(&self) -> f32;

    /// Computes the bounding box of the shape placed by `pose`.
    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox;

    /// Computes the unit mass properties of the shape.
    fn compute_mass_properties(&self) -> MassProperties;

    /// Any point inside the core; used to seed iterative queries.
    fn core_center(&self) -> Vec3;

    /// Core points of the feature (vertex, edge or face) that is extreme along `direction`, in local space.
    /// Shapes without flat features report the single support point.
    fn support_face(&self, direction: Vec3, face: &mut Vec<Vec3>) {
        face.push(self.support(direction));
    }

    /// Farthest core point along a world space direction for the shape placed by `pose`, in world space.
    #[inline(always)]
    fn world_support(&self, pose: &RigidPose, direction: Vec3) -> Vec3 {
        let local = self.support(pose.orientation.conjugate() * direction);
        pose.transform_point(local)
    }

    /// `support_face` for the shape placed by `pose`, in world space.
    fn world_support_face(&self, pose: &RigidPose, direction: Vec3, face: &mut Vec<Vec3>) {
        let start = face.len();
        self.support_face(pose.orientation.conjugate() * direction, face);
        for point in &mut face[start..] {
            *point = pose.transform_point(*point);
        }
    }
}

/// Points whose direction from the support point deviates from the plane perpendicular to `direction` by less
/// than this sine are part of the support feature.
const FEATURE_TOLERANCE: f32 = 0.1;

/// Bounds of a point cloud after placing it with `pose`.
pub(crate) fn bounds_of_points(points: &[Vec3], pose: &RigidPose) -> BoundingBox {
    let mut bounds = BoundingBox::EMPTY;
    for &point in points {
        bounds.include_point(pose.transform_point(point));
    }
    bounds
}

/// Collects the points of a convex point set that form its extreme feature along `direction`.
pub(crate) fn support_feature(points: &[Vec3], direction: Vec3, face: &mut Vec<Vec3>) {
    let support = points[support_index(points, direction)];
    let Some(direction) = direction.try_normalize() else {
        face.push(support);
        return;
    };
    let max = support.dot(direction);
    for &point in points {
        if max - point.dot(direction) <= FEATURE_TOLERANCE * (support - point).length() {
            face.push(point);
        }
    }
}

/// Index of the point with the largest projection on `direction`. The first maximum wins ties.
#[inline(always)]
pub(crate) fn support_index(points: &[Vec3], direction: Vec3) -> usize {
    let mut best = 0;
    let mut best_dot = f32::NEG_INFINITY;
    for (i, point) in points.iter().enumerate() {
        let d = point.dot(direction);
        if d > best_dot {
            best_dot = d;
            best = i;
        }
    }
    best
}
