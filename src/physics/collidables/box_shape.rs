use glam::{Quat, Vec3};

use crate::physics::body_properties::RigidPose;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::{support_feature, ConvexShape};

/// Collision shape representing a solid cuboid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    pub center: Vec3,
    pub orientation: Quat,
    /// Half of the box's extent along each local axis.
    pub half_extents: Vec3,
}

impl BoxShape {
    /// Creates a box shape.
    #[inline(always)]
    pub fn new(center: Vec3, orientation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            orientation,
            half_extents,
        }
    }

    /// Axis aligned box centered on the collider origin.
    #[inline(always)]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, half_extents)
    }

    /// Corners in the shape's local space.
    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| {
            let sign = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            self.center + self.orientation * (self.half_extents * sign)
        })
    }

    /// Placement of the box frame in collider space.
    #[inline(always)]
    pub fn local_pose(&self) -> RigidPose {
        RigidPose::new(self.center, self.orientation)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.center.is_finite()
            && self.half_extents.is_finite()
            && self.half_extents.min_element() >= 0.0
            && self.orientation.is_finite()
            && (self.orientation.length_squared() - 1.0).abs() < 1e-3
    }
}

impl ConvexShape for BoxShape {
    #[inline(always)]
    fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.orientation.conjugate() * direction;
        let corner = Vec3::select(local.cmpge(Vec3::ZERO), self.half_extents, -self.half_extents);
        self.center + self.orientation * corner
    }

    fn support_face(&self, direction: Vec3, face: &mut Vec<Vec3>) {
        support_feature(&self.corners(), direction, face);
    }

    #[inline(always)]
    fn convex_radius(&self) -> f32 {
        0.0
    }

    fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        let frame = *pose * self.local_pose();
        BoundingBox::from_center_half_extents(Vec3::ZERO, self.half_extents)
            .transformed(frame.orientation, frame.position)
    }

    fn compute_mass_properties(&self) -> MassProperties {
        MassProperties::from_box(self.center, self.orientation, self.half_extents)
    }

    #[inline(always)]
    fn core_center(&self) -> Vec3 {
        self.center
    }
}
