use glam::{Quat, Vec3};

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::ConvexShape;

const CAP_ALIGNMENT: f32 = 0.995;
const SIDE_ALIGNMENT: f32 = 0.1;

/// Collision shape representing a cylinder. The cylinder's axis is the local y axis of its frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    pub center: Vec3,
    pub orientation: Quat,
    /// Radius of the cylinder.
    pub radius: f32,
    /// Half length of the cylinder along its local Y axis.
    pub half_length: f32,
}

impl Cylinder {
    /// Creates a cylinder shape.
    #[inline(always)]
    pub fn new(center: Vec3, orientation: Quat, radius: f32, half_length: f32) -> Self {
        Self {
            center,
            orientation,
            radius,
            half_length,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.center.is_finite()
            && self.orientation.is_finite()
            && (self.orientation.length_squared() - 1.0).abs() < 1e-3
            && self.radius.is_finite()
            && self.half_length.is_finite()
            && self.radius >= 0.0
            && self.half_length >= 0.0
    }
}

impl ConvexShape for Cylinder {
    fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.orientation.conjugate() * direction;
        let horizontal = Vec3::new(local.x, 0.0, local.z);
        let horizontal_length = horizontal.length();
        let rim = if horizontal_length > 1e-12 {
            horizontal * (self.radius / horizontal_length)
        } else {
            Vec3::ZERO
        };
        let y = if local.y >= 0.0 { self.half_length } else { -self.half_length };
        self.center + self.orientation * Vec3::new(rim.x, y, rim.z)
    }

    /// Caps are approximated by eight rim points; the side by the segment under the support point.
    fn support_face(&self, direction: Vec3, face: &mut Vec<Vec3>) {
        let local = (self.orientation.conjugate() * direction).normalize_or_zero();
        if local.y.abs() > CAP_ALIGNMENT {
            let y = self.half_length.copysign(local.y);
            for i in 0..8 {
                let angle = i as f32 * std::f32::consts::FRAC_PI_4;
                let rim = Vec3::new(angle.cos() * self.radius, y, angle.sin() * self.radius);
                face.push(self.center + self.orientation * rim);
            }
        } else if local.y.abs() < SIDE_ALIGNMENT && (local.x != 0.0 || local.z != 0.0) {
            let rim = Vec3::new(local.x, 0.0, local.z).normalize() * self.radius;
            for y in [-self.half_length, self.half_length] {
                face.push(self.center + self.orientation * Vec3::new(rim.x, y, rim.z));
            }
        } else {
            face.push(self.support(direction));
        }
    }

    #[inline(always)]
    fn convex_radius(&self) -> f32 {
        0.0
    }

    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        // Extent along a world axis: |axis_y| * half_length + radius * sqrt(1 - axis_y^2).
        let orientation = pose.orientation * self.orientation;
        let axis = orientation * Vec3::Y;
        let disc = (Vec3::ONE - axis * axis).max(Vec3::ZERO);
        let disc = Vec3::new(disc.x.sqrt(), disc.y.sqrt(), disc.z.sqrt());
        let half = axis.abs() * self.half_length + disc * self.radius;
        BoundingBox::from_center_half_extents(pose.transform_point(self.center), half)
    }

    fn compute_mass_properties(&self) -> MassProperties {
        MassProperties::from_cylinder(self.center, self.orientation, self.radius, self.half_length)
    }

    #[inline(always)]
    fn core_center(&self) -> Vec3 {
        self.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upright_cylinder_bounds() {
        let cylinder = Cylinder::new(Vec3::ZERO, Quat::IDENTITY, 0.5, 2.0);
        let bounds = cylinder.compute_bounds(&RigidPose::from_position(Vec3::new(1.0, 0.0, 0.0)));
        assert!(bounds.min.abs_diff_eq(Vec3::new(0.5, -2.0, -0.5), 1e-5));
        assert!(bounds.max.abs_diff_eq(Vec3::new(1.5, 2.0, 0.5), 1e-5));
    }

    #[test]
    fn support_reaches_rim() {
        let cylinder = Cylinder::new(Vec3::ZERO, Quat::IDENTITY, 1.0, 1.0);
        let point = cylinder.support(Vec3::new(1.0, 1.0, 0.0));
        assert!(point.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }
}
