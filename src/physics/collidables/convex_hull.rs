use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::{bounds_of_points, support_feature, support_index, ConvexShape};

/// Points closer than this to an earlier point are merged during construction.
const WELD_DISTANCE_SQUARED: f32 = 1e-10;
/// Minimum extent along some direction for a point set to be considered solid.
const DEGENERATE_EXTENT: f32 = 1e-5;

/// Convex hull of a point cloud, represented by its points. Support queries pick the extreme point, so
/// interior points never influence collision results.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    points: Vec<Vec3>,
    center: Vec3,
    bounds: BoundingBox,
}

impl ConvexHull {
    /// Creates a hull from a point set. The set must be non-empty, finite and span a volume.
    pub fn new(points: &[Vec3]) -> PhysicsResult<Self> {
        if points.is_empty() {
            return Err(PhysicsError::EmptyPointSet);
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(PhysicsError::InvalidGeometry {
                reason: "convex hull point is not finite",
            });
        }

        let mut welded: Vec<Vec3> = Vec::with_capacity(points.len());
        for &point in points {
            if !welded.iter().any(|w| w.distance_squared(point) < WELD_DISTANCE_SQUARED) {
                welded.push(point);
            }
        }
        if !spans_volume(&welded) {
            return Err(PhysicsError::DegenerateConvexHull);
        }

        let bounds = BoundingBox::from_points(&welded);
        let center = welded.iter().copied().sum::<Vec3>() / welded.len() as f32;
        Ok(Self {
            points: welded,
            center,
            bounds,
        })
    }

    #[inline(always)]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Local bounds of the hull's points.
    #[inline(always)]
    pub fn local_bounds(&self) -> BoundingBox {
        self.bounds
    }
}

/// Finds four affinely independent points: an extreme pair, the point farthest from their line and the point
/// farthest from their plane.
fn spans_volume(points: &[Vec3]) -> bool {
    if points.len() < 4 {
        return false;
    }
    let p0 = points[0];
    let p1 = points
        .iter()
        .copied()
        .max_by(|a, b| a.distance_squared(p0).total_cmp(&b.distance_squared(p0)))
        .unwrap_or(p0);
    let line = p1 - p0;
    if line.length() < DEGENERATE_EXTENT {
        return false;
    }
    let line = line.normalize();
    let p2 = points
        .iter()
        .copied()
        .max_by(|a, b| {
            line.cross(*a - p0)
                .length_squared()
                .total_cmp(&line.cross(*b - p0).length_squared())
        })
        .unwrap_or(p0);
    let plane = line.cross(p2 - p0);
    if plane.length() < DEGENERATE_EXTENT {
        return false;
    }
    let plane = plane.normalize();
    points
        .iter()
        .any(|p| plane.dot(*p - p0).abs() >= DEGENERATE_EXTENT)
}

impl ConvexShape for ConvexHull {
    #[inline(always)]
    fn support(&self, direction: Vec3) -> Vec3 {
        self.points[support_index(&self.points, direction)]
    }

    fn support_face(&self, direction: Vec3, face: &mut Vec<Vec3>) {
        support_feature(&self.points, direction, face);
    }

    #[inline(always)]
    fn convex_radius(&self) -> f32 {
        0.0
    }

    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        bounds_of_points(&self.points, pose)
    }

    /// Approximated by the hull's local bounding box.
    fn compute_mass_properties(&self) -> MassProperties {
        let mut properties =
            MassProperties::from_box(self.bounds.center(), glam::Quat::IDENTITY, self.bounds.extents() * 0.5);
        properties.angular_expansion_factor = self
            .points
            .iter()
            .map(|p| p.distance(self.bounds.center()))
            .fold(0.0, f32::max);
        properties
    }

    #[inline(always)]
    fn core_center(&self) -> Vec3 {
        self.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_points() -> Vec<Vec3> {
        let mut points = Vec::new();
        for i in 0..8 {
            points.push(Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            ));
        }
        points
    }

    #[test]
    fn rejects_empty_and_flat_sets() {
        assert_eq!(ConvexHull::new(&[]), Err(PhysicsError::EmptyPointSet));
        let flat = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ];
        assert_eq!(ConvexHull::new(&flat), Err(PhysicsError::DegenerateConvexHull));
        let repeated = [Vec3::ONE; 6];
        assert_eq!(ConvexHull::new(&repeated), Err(PhysicsError::DegenerateConvexHull));
    }

    #[test]
    fn cube_support_and_mass() {
        let hull = ConvexHull::new(&cube_points()).unwrap();
        assert_eq!(hull.support(Vec3::new(1.0, 2.0, 3.0)), Vec3::ONE);
        let mass = hull.compute_mass_properties();
        assert!((mass.volume - 8.0).abs() < 1e-5);
        assert!(mass.mass_distribution.transform.position.abs_diff_eq(Vec3::ZERO, 1e-6));
    }
}
