use glam::{BVec3, Mat3, Quat, Vec3};

use crate::physics::body_properties::RigidPose;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::handles::BodyIndexPair;

use super::constraint::Constraint;

/// Joint anchor in a body's space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    /// Primary axis; axis 0 of the joint frame.
    pub axis: Vec3,
    /// Axis 1 of the joint frame; must be perpendicular to `axis`.
    pub perpendicular_axis: Vec3,
    pub position: Vec3,
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BodyFrame {
    pub const IDENTITY: Self = Self {
        axis: Vec3::X,
        perpendicular_axis: Vec3::Y,
        position: Vec3::ZERO,
    };

    pub fn new(axis: Vec3, perpendicular_axis: Vec3, position: Vec3) -> Self {
        Self {
            axis,
            perpendicular_axis,
            position,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_pose(pose: &RigidPose) -> Self {
        Self {
            axis: pose.orientation * Vec3::X,
            perpendicular_axis: pose.orientation * Vec3::Y,
            position: pose.position,
        }
    }

    /// The frame as a transform from joint space to body space. The third axis is `axis x perpendicular_axis`.
    pub fn as_rigid_pose(&self) -> RigidPose {
        let axis = self.axis.normalize_or(Vec3::X);
        let perpendicular = (self.perpendicular_axis - axis * axis.dot(self.perpendicular_axis)).normalize_or(axis.any_orthonormal_vector());
        let rotation = Mat3::from_cols(axis, perpendicular, axis.cross(perpendicular));
        RigidPose::new(self.position, Quat::from_mat3(&rotation).normalize())
    }

    fn is_valid(&self) -> bool {
        let axis_length = self.axis.length();
        let perpendicular_length = self.perpendicular_axis.length();
        self.position.is_finite()
            && axis_length.is_finite()
            && perpendicular_length.is_finite()
            && axis_length > 1e-6
            && perpendicular_length > 1e-6
            && (self.axis.dot(self.perpendicular_axis) / (axis_length * perpendicular_length)).abs() < 1e-3
    }
}

/// Restricts the relative motion of two bodies with up to `Joint::MAX_CONSTRAINTS` constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub body_pair: BodyIndexPair,
    pub body_frame_a: BodyFrame,
    pub body_frame_b: BodyFrame,
    constraints: Vec<Constraint>,
    /// Whether the connected bodies still collide with each other.
    pub enable_collision: bool,
}

impl Joint {
    pub const MAX_CONSTRAINTS: usize = 3;

    /// Creates a joint between the frames of two distinct bodies.
    pub fn new(
        body_pair: BodyIndexPair,
        body_frame_a: BodyFrame,
        body_frame_b: BodyFrame,
        constraints: &[Constraint],
    ) -> PhysicsResult<Self> {
        if body_pair.body_index_a == body_pair.body_index_b {
            return Err(PhysicsError::InvalidJoint {
                reason: "a joint must connect two different bodies",
            });
        }
        if !body_frame_a.is_valid() || !body_frame_b.is_valid() {
            return Err(PhysicsError::InvalidJoint {
                reason: "body frame axes must be finite, nonzero and perpendicular",
            });
        }
        let mut joint = Self::with_body_pair(body_pair);
        joint.body_frame_a = body_frame_a;
        joint.body_frame_b = body_frame_b;
        joint.set_constraints(constraints)?;
        Ok(joint)
    }

    /// Joint without constraints and identity frames. It only affects pair scheduling and collision.
    pub fn with_body_pair(body_pair: BodyIndexPair) -> Self {
        Self {
            body_pair,
            body_frame_a: BodyFrame::IDENTITY,
            body_frame_b: BodyFrame::IDENTITY,
            constraints: Vec::new(),
            enable_collision: false,
        }
    }

    #[inline(always)]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn set_constraints(&mut self, constraints: &[Constraint]) -> PhysicsResult<()> {
        if constraints.len() > Self::MAX_CONSTRAINTS {
            return Err(PhysicsError::TooManyConstraints {
                count: constraints.len(),
                limit: Self::MAX_CONSTRAINTS,
            });
        }
        if !constraints.is_empty() && self.body_pair.body_index_a == self.body_pair.body_index_b {
            return Err(PhysicsError::InvalidJoint {
                reason: "a joint must connect two different bodies",
            });
        }
        if !constraints.iter().all(Constraint::is_valid) {
            return Err(PhysicsError::InvalidJoint {
                reason: "constraint limits, springs or motor axes are malformed",
            });
        }
        self.constraints = constraints.to_vec();
        Ok(())
    }

    #[inline(always)]
    pub fn with_collision_enabled(mut self, enable_collision: bool) -> Self {
        self.enable_collision = enable_collision;
        self
    }

    /// Keeps the anchors coincident while leaving rotation free.
    pub fn ball_and_socket(body_pair: BodyIndexPair, anchor_a: Vec3, anchor_b: Vec3) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            BodyFrame::from_position(anchor_a),
            BodyFrame::from_position(anchor_b),
            &[Constraint::ball_and_socket()],
        )
    }

    /// Locks all relative motion.
    pub fn fixed(body_pair: BodyIndexPair, frame_a: BodyFrame, frame_b: BodyFrame) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[Constraint::ball_and_socket(), Constraint::fixed_angle()],
        )
    }

    /// Allows rotation about the frames' primary axis only.
    pub fn hinge(body_pair: BodyIndexPair, frame_a: BodyFrame, frame_b: BodyFrame) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[Constraint::hinge(0), Constraint::ball_and_socket()],
        )
    }

    /// Hinge whose rotation about the primary axis stays within `[min_angle, max_angle]`.
    pub fn limited_hinge(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        min_angle: f32,
        max_angle: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[
                Constraint::twist(0, min_angle, max_angle),
                Constraint::hinge(0),
                Constraint::ball_and_socket(),
            ],
        )
    }

    /// Allows sliding along the primary axis within `[min_distance, max_distance]`.
    pub fn prismatic(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        min_distance: f32,
        max_distance: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[
                Constraint::fixed_angle(),
                Constraint::cylindrical(0, 0.0, 0.0),
                Constraint::planar(0, min_distance, max_distance),
            ],
        )
    }

    /// Locks the selected linear and angular axes of frame A exactly.
    pub fn limited_dof(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        linear_locks: BVec3,
        angular_locks: BVec3,
    ) -> PhysicsResult<Self> {
        let mut constraints = Vec::with_capacity(2);
        if linear_locks.any() {
            constraints.push(Constraint {
                constrained_axes: linear_locks,
                ..Constraint::ball_and_socket()
            });
        }
        if angular_locks.any() {
            constraints.push(Constraint {
                constrained_axes: angular_locks,
                ..Constraint::fixed_angle()
            });
        }
        Self::new(body_pair, frame_a, frame_b, &constraints)
    }

    /// Limits the rotation about the primary axis; all other motion is free.
    pub fn twist(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        min_angle: f32,
        max_angle: f32,
    ) -> PhysicsResult<Self> {
        Self::new(body_pair, frame_a, frame_b, &[Constraint::twist(0, min_angle, max_angle)])
    }

    /// Keeps the anchor distance within `[min_distance, max_distance]`.
    pub fn limited_distance(
        body_pair: BodyIndexPair,
        anchor_a: Vec3,
        anchor_b: Vec3,
        min_distance: f32,
        max_distance: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            BodyFrame::from_position(anchor_a),
            BodyFrame::from_position(anchor_b),
            &[Constraint::limited_distance(min_distance, max_distance)],
        )
    }

    /// Slides along the primary axis toward `target` offset.
    pub fn position_motor(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        target: f32,
        max_impulse: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[
                Constraint::position_motor(0, target, max_impulse),
                Constraint::cylindrical(0, 0.0, 0.0),
                Constraint::fixed_angle(),
            ],
        )
    }

    /// Turns about the primary axis toward `target` angle.
    pub fn rotation_motor(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        target: f32,
        max_impulse: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[
                Constraint::rotation_motor(0, target, max_impulse),
                Constraint::hinge(0),
                Constraint::ball_and_socket(),
            ],
        )
    }

    /// Slides along the primary axis at `target` velocity.
    pub fn linear_velocity_motor(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        target: f32,
        max_impulse: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[
                Constraint::linear_velocity_motor(0, target, max_impulse),
                Constraint::cylindrical(0, 0.0, 0.0),
                Constraint::fixed_angle(),
            ],
        )
    }

    /// Spins about the primary axis at `target` angular velocity.
    pub fn angular_velocity_motor(
        body_pair: BodyIndexPair,
        frame_a: BodyFrame,
        frame_b: BodyFrame,
        target: f32,
        max_impulse: f32,
    ) -> PhysicsResult<Self> {
        Self::new(
            body_pair,
            frame_a,
            frame_b,
            &[
                Constraint::angular_velocity_motor(0, target, max_impulse),
                Constraint::hinge(0),
                Constraint::ball_and_socket(),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_joints_and_constraint_overflow() {
        let same = BodyIndexPair::new(3, 3);
        assert!(matches!(
            Joint::ball_and_socket(same, Vec3::ZERO, Vec3::ZERO),
            Err(PhysicsError::InvalidJoint { .. })
        ));
        let pair = BodyIndexPair::new(0, 1);
        let four = [Constraint::ball_and_socket(); 4];
        assert!(matches!(
            Joint::new(pair, BodyFrame::IDENTITY, BodyFrame::IDENTITY, &four),
            Err(PhysicsError::TooManyConstraints { count: 4, limit: 3 })
        ));
        let reversed = Constraint::limited_distance(2.0, 1.0);
        assert!(Joint::new(pair, BodyFrame::IDENTITY, BodyFrame::IDENTITY, &[reversed]).is_err());
    }

    #[test]
    fn frame_pose_uses_axis_and_perpendicular() {
        let frame = BodyFrame::new(Vec3::Y, Vec3::Z, Vec3::new(1.0, 2.0, 3.0));
        let pose = frame.as_rigid_pose();
        assert!((pose.orientation * Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
        assert!((pose.orientation * Vec3::Y).abs_diff_eq(Vec3::Z, 1e-5));
        assert!((pose.orientation * Vec3::Z).abs_diff_eq(Vec3::X, 1e-5));
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn limited_hinge_uses_three_constraints() {
        let joint = Joint::limited_hinge(
            BodyIndexPair::new(0, 1),
            BodyFrame::IDENTITY,
            BodyFrame::IDENTITY,
            -0.5,
            0.5,
        )
        .unwrap();
        assert_eq!(joint.constraints().len(), 3);
        assert!(!joint.enable_collision);
    }
}
