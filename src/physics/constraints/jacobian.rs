use std::fmt;
use std::ops::BitOr;

use glam::{BVec3, Quat, Vec3};

use crate::physics::body_properties::{MotionVelocity, RigidPose};
use crate::physics::events::{ImpulseEvent, SimulationEvents};
use crate::physics::handles::{BodyIndexPair, JointIndex};
use crate::physics::solver::StepInput;

use super::angular_limit::{AngularLimit1DJacobian, AngularLimit2DJacobian, AngularLimit3DJacobian};
use super::contact::contact_jacobian::{ContactJacobian, TriggerJacobian};
use super::linear_limit::LinearLimitJacobian;
use super::constraint::ConstraintType;
use super::motors::{TargetMotorJacobian, VelocityMotorJacobian};
use super::spring_settings::JacobianUtilities;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JacobianType {
    LinearLimit,
    AngularLimit1D,
    AngularLimit2D,
    AngularLimit3D,
    PositionMotor,
    RotationMotor,
    LinearVelocityMotor,
    AngularVelocityMotor,
    Contact,
    Trigger,
}

/// Optional behaviors of a jacobian.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JacobianFlags(u8);

impl JacobianFlags {
    pub const NONE: Self = Self(0);
    pub const ENABLE_COLLISION_EVENTS: Self = Self(1 << 0);
    pub const ENABLE_IMPULSE_EVENTS: Self = Self(1 << 1);

    #[inline(always)]
    pub fn contains(self, other: JacobianFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline(always)]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for JacobianFlags {
    type Output = JacobianFlags;

    #[inline(always)]
    fn bitor(self, rhs: JacobianFlags) -> JacobianFlags {
        JacobianFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianHeader {
    pub body_pair: BodyIndexPair,
    pub kind: JacobianType,
    pub flags: JacobianFlags,
    /// Joint that produced the jacobian; `None` for contacts and triggers.
    pub joint_index: Option<JointIndex>,
}

/// Pose and velocity of one body of a jacobian at the start of the solve. Static bodies use their body pose as
/// motion frame and `MotionVelocity::ZERO`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianBodyState {
    pub world_from_body: RigidPose,
    pub world_from_motion: RigidPose,
    pub velocity: MotionVelocity,
}

impl JacobianBodyState {
    pub fn fixed(world_from_body: RigidPose) -> Self {
        Self {
            world_from_body,
            world_from_motion: world_from_body,
            velocity: MotionVelocity::ZERO,
        }
    }
}

/// Motion frames of both bodies. They do not move while the solver runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianBodies {
    pub world_from_motion_a: RigidPose,
    pub world_from_motion_b: RigidPose,
}

impl JacobianBodies {
    pub fn new(a: &JacobianBodyState, b: &JacobianBodyState) -> Self {
        Self {
            world_from_motion_a: a.world_from_motion,
            world_from_motion_b: b.world_from_motion,
        }
    }

    /// World angular velocity of B minus that of A.
    #[inline(always)]
    pub fn angular_velocity_difference(&self, velocity_a: &MotionVelocity, velocity_b: &MotionVelocity) -> Vec3 {
        self.world_from_motion_b.orientation * velocity_b.angular_velocity
            - self.world_from_motion_a.orientation * velocity_a.angular_velocity
    }

    /// Velocity of world point `point_b` moving with B minus that of `point_a` moving with A.
    #[inline(always)]
    pub fn point_velocity_difference(
        &self,
        point_a: Vec3,
        point_b: Vec3,
        velocity_a: &MotionVelocity,
        velocity_b: &MotionVelocity,
    ) -> Vec3 {
        let angular_a = self.world_from_motion_a.orientation * velocity_a.angular_velocity;
        let angular_b = self.world_from_motion_b.orientation * velocity_b.angular_velocity;
        velocity_b.linear_velocity + angular_b.cross(point_b - self.world_from_motion_b.position)
            - velocity_a.linear_velocity
            - angular_a.cross(point_a - self.world_from_motion_a.position)
    }

    /// Row separating `point_b` on B from `point_a` on A along `direction`.
    pub fn linear_row(
        &self,
        direction: Vec3,
        point_a: Vec3,
        point_b: Vec3,
        velocity_a: &MotionVelocity,
        velocity_b: &MotionVelocity,
    ) -> JacobianRow {
        let arm_a = point_a - self.world_from_motion_a.position;
        let arm_b = point_b - self.world_from_motion_b.position;
        JacobianRow::new(
            direction,
            self.world_from_motion_a.orientation.conjugate() * arm_a.cross(direction),
            self.world_from_motion_b.orientation.conjugate() * arm_b.cross(direction),
            velocity_a,
            velocity_b,
        )
    }

    /// Row rotating B relative to A about the world `axis`.
    pub fn angular_row(&self, axis: Vec3, velocity_a: &MotionVelocity, velocity_b: &MotionVelocity) -> JacobianRow {
        JacobianRow::new(
            Vec3::ZERO,
            self.world_from_motion_a.orientation.conjugate() * axis,
            self.world_from_motion_b.orientation.conjugate() * axis,
            velocity_a,
            velocity_b,
        )
    }
}

/// One scalar constraint row. The linear part is in world space; the angular parts are in each body's motion
/// space. The row's rate is B's contribution minus A's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JacobianRow {
    pub linear: Vec3,
    pub angular_a: Vec3,
    pub angular_b: Vec3,
    /// Inverse of the row's inverse effective mass, or zero when neither body can respond.
    pub effective_mass: f32,
}

impl JacobianRow {
    pub fn new(
        linear: Vec3,
        angular_a: Vec3,
        angular_b: Vec3,
        velocity_a: &MotionVelocity,
        velocity_b: &MotionVelocity,
    ) -> Self {
        let inverse_effective_mass = linear.length_squared() * (velocity_a.inverse_mass + velocity_b.inverse_mass)
            + (angular_a * angular_a).dot(velocity_a.inverse_inertia)
            + (angular_b * angular_b).dot(velocity_b.inverse_inertia);
        let effective_mass = if inverse_effective_mass > 1e-12 {
            1.0 / inverse_effective_mass
        } else {
            0.0
        };
        Self {
            linear,
            angular_a,
            angular_b,
            effective_mass,
        }
    }

    #[inline(always)]
    pub fn relative_velocity(&self, velocity_a: &MotionVelocity, velocity_b: &MotionVelocity) -> f32 {
        velocity_b.linear_velocity.dot(self.linear) + velocity_b.angular_velocity.dot(self.angular_b)
            - velocity_a.linear_velocity.dot(self.linear)
            - velocity_a.angular_velocity.dot(self.angular_a)
    }

    /// Applies `impulse` along the row: positive impulses increase the row's relative velocity.
    #[inline(always)]
    pub fn apply_impulse(&self, impulse: f32, velocity_a: &mut MotionVelocity, velocity_b: &mut MotionVelocity) {
        velocity_a.apply_linear_impulse(self.linear * -impulse);
        velocity_a.apply_angular_impulse(self.angular_a * -impulse);
        velocity_b.apply_linear_impulse(self.linear * impulse);
        velocity_b.apply_angular_impulse(self.angular_b * impulse);
    }
}

/// Soft limit shared by joint jacobians: the constrained value is kept within `[min, max]`, pulled back with
/// the stiffness `tau` and `damping` derived from the constraint's spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftLimit {
    pub min: f32,
    pub max: f32,
    /// Limit error at the start of the step.
    pub initial_error: f32,
    pub tau: f32,
    pub damping: f32,
}

impl SoftLimit {
    pub fn new(value: f32, min: f32, max: f32, tau: f32, damping: f32) -> Self {
        Self {
            min,
            max,
            initial_error: JacobianUtilities::calculate_error(value, min, max),
            tau,
            damping,
        }
    }

    /// Change of the constrained rate that removes this iteration's share of the error, given the value at
    /// the start of the step and its current rate of change.
    #[inline(always)]
    pub fn delta_rate(&self, value: f32, rate: f32, timestep: f32) -> f32 {
        let predicted_error = JacobianUtilities::calculate_error(value + rate * timestep, self.min, self.max);
        let correction =
            JacobianUtilities::calculate_correction(predicted_error, self.initial_error, self.tau, self.damping);
        -correction / timestep
    }
}

/// Sums the impulse a joint jacobian applies over a step and reports it when it exceeds the constraint's
/// `max_impulse` on a constrained axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseEventTracker {
    pub kind: ConstraintType,
    /// World orientation of joint frame A; impulses are reported in this frame.
    pub frame_a_orientation: Quat,
    pub constrained_axes: BVec3,
    pub max_impulse: Vec3,
    /// World space impulse applied so far.
    pub accumulated_impulse: Vec3,
}

impl ImpulseEventTracker {
    pub fn new(kind: ConstraintType, frame_a_orientation: Quat, constrained_axes: BVec3, max_impulse: Vec3) -> Self {
        Self {
            kind,
            frame_a_orientation,
            constrained_axes,
            max_impulse,
            accumulated_impulse: Vec3::ZERO,
        }
    }

    #[inline(always)]
    pub fn accumulate(&mut self, impulse: Vec3) {
        self.accumulated_impulse += impulse;
    }

    /// Raises the event on the final iteration when the header asks for it and a limit was exceeded.
    pub fn finish(&self, header: &JacobianHeader, step: &StepInput, events: &mut SimulationEvents) {
        if !step.is_last_iteration() || !header.flags.contains(JacobianFlags::ENABLE_IMPULSE_EVENTS) {
            return;
        }
        let Some(joint_index) = header.joint_index else {
            return;
        };
        let impulse = self.frame_a_orientation.conjugate() * self.accumulated_impulse;
        let exceeded = (0..3)
            .any(|axis| self.constrained_axes.test(axis) && impulse[axis].abs() > self.max_impulse[axis]);
        if exceeded {
            events.impulse_events.push(ImpulseEvent {
                joint_index,
                body_pair: header.body_pair,
                kind: self.kind,
                impulse,
            });
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JacobianData {
    LinearLimit(LinearLimitJacobian),
    AngularLimit1D(AngularLimit1DJacobian),
    AngularLimit2D(AngularLimit2DJacobian),
    AngularLimit3D(AngularLimit3DJacobian),
    PositionMotor(TargetMotorJacobian),
    RotationMotor(TargetMotorJacobian),
    LinearVelocityMotor(VelocityMotorJacobian),
    AngularVelocityMotor(VelocityMotorJacobian),
    Contact(ContactJacobian),
    Trigger(TriggerJacobian),
}

/// A self describing constraint record, built once per step and consumed by every solver iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    pub header: JacobianHeader,
    pub data: JacobianData,
}

impl Jacobian {
    /// Solves the jacobian once. `velocity_a` and `velocity_b` belong to the header's bodies. Events are only
    /// raised on the final iteration.
    ///
    /// Panics when the header's type does not describe the payload.
    pub fn solve(
        &mut self,
        velocity_a: &mut MotionVelocity,
        velocity_b: &mut MotionVelocity,
        step: &StepInput,
        events: &mut SimulationEvents,
    ) {
        let header = &self.header;
        match (header.kind, &mut self.data) {
            (JacobianType::LinearLimit, JacobianData::LinearLimit(jacobian)) => {
                jacobian.solve(header, velocity_a, velocity_b, step, events)
            }
            (JacobianType::AngularLimit1D, JacobianData::AngularLimit1D(jacobian)) => {
                jacobian.solve(header, velocity_a, velocity_b, step, events)
            }
            (JacobianType::AngularLimit2D, JacobianData::AngularLimit2D(jacobian)) => {
                jacobian.solve(header, velocity_a, velocity_b, step, events)
            }
            (JacobianType::AngularLimit3D, JacobianData::AngularLimit3D(jacobian)) => {
                jacobian.solve(header, velocity_a, velocity_b, step, events)
            }
            (JacobianType::PositionMotor, JacobianData::PositionMotor(jacobian)) => {
                jacobian.solve(velocity_a, velocity_b, step)
            }
            (JacobianType::RotationMotor, JacobianData::RotationMotor(jacobian)) => {
                jacobian.solve(velocity_a, velocity_b, step)
            }
            (JacobianType::LinearVelocityMotor, JacobianData::LinearVelocityMotor(jacobian)) => {
                jacobian.solve(velocity_a, velocity_b)
            }
            (JacobianType::AngularVelocityMotor, JacobianData::AngularVelocityMotor(jacobian)) => {
                jacobian.solve(velocity_a, velocity_b)
            }
            (JacobianType::Contact, JacobianData::Contact(jacobian)) => {
                jacobian.solve(header, velocity_a, velocity_b, step, events)
            }
            (JacobianType::Trigger, JacobianData::Trigger(jacobian)) => {
                jacobian.solve(header, velocity_a, velocity_b, step, events)
            }
            (kind, data) => panic!("unexpected jacobian type {kind:?} for payload {}", data.name()),
        }
    }

    /// Limit error at the start of the step, for joint limits and position motors.
    pub fn initial_error(&self) -> Option<f32> {
        match &self.data {
            JacobianData::LinearLimit(jacobian) => Some(jacobian.limit.initial_error),
            JacobianData::AngularLimit1D(jacobian) => Some(jacobian.limit.initial_error),
            JacobianData::AngularLimit2D(jacobian) => Some(jacobian.limit.initial_error),
            JacobianData::AngularLimit3D(jacobian) => Some(jacobian.limit.initial_error),
            JacobianData::PositionMotor(jacobian) => Some(jacobian.limit.initial_error),
            JacobianData::RotationMotor(jacobian) => Some(jacobian.limit.initial_error),
            _ => None,
        }
    }

    /// Whether the jacobian restricts rotation rather than translation.
    pub fn is_angular(&self) -> bool {
        matches!(
            self.header.kind,
            JacobianType::AngularLimit1D
                | JacobianType::AngularLimit2D
                | JacobianType::AngularLimit3D
                | JacobianType::RotationMotor
                | JacobianType::AngularVelocityMotor
        )
    }
}

impl JacobianData {
    fn name(&self) -> &'static str {
        match self {
            JacobianData::LinearLimit(_) => "LinearLimit",
            JacobianData::AngularLimit1D(_) => "AngularLimit1D",
            JacobianData::AngularLimit2D(_) => "AngularLimit2D",
            JacobianData::AngularLimit3D(_) => "AngularLimit3D",
            JacobianData::PositionMotor(_) => "PositionMotor",
            JacobianData::RotationMotor(_) => "RotationMotor",
            JacobianData::LinearVelocityMotor(_) => "LinearVelocityMotor",
            JacobianData::AngularVelocityMotor(_) => "AngularVelocityMotor",
            JacobianData::Contact(_) => "Contact",
            JacobianData::Trigger(_) => "Trigger",
        }
    }
}

impl fmt::Display for JacobianType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Walks a jacobian stream in order, handing out each record once.
pub struct JacobianIterator<'a> {
    remaining: &'a mut [Jacobian],
}

impl<'a> JacobianIterator<'a> {
    pub fn new(jacobians: &'a mut [Jacobian]) -> Self {
        Self { remaining: jacobians }
    }

    #[inline(always)]
    pub fn has_more(&self) -> bool {
        !self.remaining.is_empty()
    }

    #[inline(always)]
    pub fn read_next(&mut self) -> Option<&'a mut Jacobian> {
        let remaining = std::mem::take(&mut self.remaining);
        let (next, rest) = remaining.split_first_mut()?;
        self.remaining = rest;
        Some(next)
    }
}

impl<'a> Iterator for JacobianIterator<'a> {
    type Item = &'a mut Jacobian;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

/// Relative orientation of frame B in frame A, with a non-negative scalar part.
#[inline(always)]
pub(crate) fn relative_orientation(frame_a: Quat, frame_b: Quat) -> Quat {
    let q = (frame_a.conjugate() * frame_b).normalize();
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::constraints::motors::VelocityMotorJacobian;

    fn unit_body() -> MotionVelocity {
        MotionVelocity {
            inverse_mass: 1.0,
            inverse_inertia: Vec3::ONE,
            ..MotionVelocity::ZERO
        }
    }

    #[test]
    fn row_impulse_matches_effective_mass() {
        let bodies = JacobianBodies {
            world_from_motion_a: RigidPose::IDENTITY,
            world_from_motion_b: RigidPose::from_position(Vec3::new(2.0, 0.0, 0.0)),
        };
        let mut a = unit_body();
        let mut b = unit_body();
        let row = bodies.linear_row(Vec3::Y, Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), &a, &b);
        // Each body contributes 1 from mass and 1 from the unit lever arm.
        assert!((row.effective_mass - 0.25).abs() < 1e-6);
        row.apply_impulse(row.effective_mass * 3.0, &mut a, &mut b);
        assert!((row.relative_velocity(&a, &b) - 3.0).abs() < 1e-5);
        assert!(row.relative_velocity(&a, &b) > 0.0);
    }

    #[test]
    fn infinite_masses_have_zero_effective_mass() {
        let row = JacobianRow::new(Vec3::X, Vec3::Y, Vec3::Z, &MotionVelocity::ZERO, &MotionVelocity::ZERO);
        assert_eq!(row.effective_mass, 0.0);
    }

    #[test]
    fn iterator_visits_each_jacobian_once() {
        let header = JacobianHeader {
            body_pair: BodyIndexPair::new(0, 1),
            kind: JacobianType::LinearVelocityMotor,
            flags: JacobianFlags::NONE,
            joint_index: Some(JointIndex(0)),
        };
        let row = JacobianRow::new(Vec3::X, Vec3::ZERO, Vec3::ZERO, &unit_body(), &unit_body());
        let jacobian = Jacobian {
            header,
            data: JacobianData::LinearVelocityMotor(VelocityMotorJacobian::new(row, 1.0, 10.0, 1.0)),
        };
        let mut jacobians = vec![jacobian.clone(), jacobian.clone(), jacobian];
        let mut iterator = JacobianIterator::new(&mut jacobians);
        let mut visited = 0;
        while iterator.has_more() {
            let next = iterator.read_next().unwrap();
            next.header.flags = JacobianFlags::ENABLE_IMPULSE_EVENTS;
            visited += 1;
        }
        assert_eq!(visited, 3);
        assert!(iterator.read_next().is_none());
        assert!(jacobians.iter().all(|j| j.header.flags.contains(JacobianFlags::ENABLE_IMPULSE_EVENTS)));
    }

    #[test]
    #[should_panic(expected = "unexpected jacobian type")]
    fn mismatched_type_is_fatal() {
        let row = JacobianRow::new(Vec3::X, Vec3::ZERO, Vec3::ZERO, &unit_body(), &unit_body());
        let mut jacobian = Jacobian {
            header: JacobianHeader {
                body_pair: BodyIndexPair::new(0, 1),
                kind: JacobianType::Contact,
                flags: JacobianFlags::NONE,
                joint_index: None,
            },
            data: JacobianData::LinearVelocityMotor(VelocityMotorJacobian::new(row, 1.0, 10.0, 1.0)),
        };
        let step = StepInput::new(1.0 / 60.0, 4, 0);
        jacobian.solve(&mut unit_body(), &mut unit_body(), &step, &mut SimulationEvents::default());
    }
}
