use glam::Vec3;

use crate::physics::handles::JointIndex;

use super::angular_limit::{
    twist_angle_and_axis, AngularLimit1DJacobian, AngularLimit2DJacobian, AngularLimit3DJacobian,
};
use super::constraint::{Constraint, ConstraintType};
use super::jacobian::{
    relative_orientation, Jacobian, JacobianBodies, JacobianBodyState, JacobianData, JacobianFlags, JacobianHeader,
    JacobianRow, JacobianType,
};
use super::joint::Joint;
use super::linear_limit::LinearLimitJacobian;
use super::motors::{TargetMotorJacobian, VelocityMotorJacobian};
use super::spring_settings::JacobianUtilities;

/// Builds the jacobians of a joint for one step.
pub struct JointJacobianBuilder;

impl JointJacobianBuilder {
    /// Appends one jacobian per constraint of `joint` to `output`, in constraint order.
    pub fn build_jacobians(
        joint: &Joint,
        joint_index: JointIndex,
        body_a: &JacobianBodyState,
        body_b: &JacobianBodyState,
        timestep: f32,
        solver_iteration_count: u32,
        output: &mut Vec<Jacobian>,
    ) {
        let frame_a = body_a.world_from_body * joint.body_frame_a.as_rigid_pose();
        let frame_b = body_b.world_from_body * joint.body_frame_b.as_rigid_pose();
        let bodies = JacobianBodies::new(body_a, body_b);
        let (velocity_a, velocity_b) = (&body_a.velocity, &body_b.velocity);

        for constraint in joint.constraints() {
            let (tau, damping) = JacobianUtilities::calculate_constraint_tau_and_damping(
                constraint.spring_frequency,
                constraint.damping_ratio,
                timestep,
                solver_iteration_count,
            );
            let axis_index = constraint.axis_index();
            let (kind, data) = match constraint.kind {
                ConstraintType::Linear => (
                    JacobianType::LinearLimit,
                    JacobianData::LinearLimit(LinearLimitJacobian::build(
                        constraint, &frame_a, &frame_b, bodies, tau, damping,
                    )),
                ),
                ConstraintType::Angular => match constraint.dimension() {
                    1 => (
                        JacobianType::AngularLimit1D,
                        JacobianData::AngularLimit1D(AngularLimit1DJacobian::build(
                            constraint,
                            frame_a.orientation,
                            frame_b.orientation,
                            &bodies,
                            velocity_a,
                            velocity_b,
                            tau,
                            damping,
                        )),
                    ),
                    2 => (
                        JacobianType::AngularLimit2D,
                        JacobianData::AngularLimit2D(AngularLimit2DJacobian::build(
                            constraint,
                            frame_a.orientation,
                            frame_b.orientation,
                            bodies,
                            tau,
                            damping,
                        )),
                    ),
                    _ => (
                        JacobianType::AngularLimit3D,
                        JacobianData::AngularLimit3D(AngularLimit3DJacobian::build(
                            constraint,
                            frame_a.orientation,
                            frame_b.orientation,
                            bodies,
                            tau,
                            damping,
                        )),
                    ),
                },
                ConstraintType::PositionMotor => {
                    let axis = frame_a.orientation * Vec3::AXES[axis_index];
                    let row = bodies.linear_row(axis, frame_a.position, frame_b.position, velocity_a, velocity_b);
                    let value = (frame_b.position - frame_a.position).dot(axis);
                    (
                        JacobianType::PositionMotor,
                        JacobianData::PositionMotor(Self::target_motor(constraint, row, value, tau, damping)),
                    )
                }
                ConstraintType::RotationMotor => {
                    let relative = relative_orientation(frame_a.orientation, frame_b.orientation);
                    let (value, local_axis) = twist_angle_and_axis(relative, axis_index);
                    let row = bodies.angular_row(frame_a.orientation * local_axis, velocity_a, velocity_b);
                    (
                        JacobianType::RotationMotor,
                        JacobianData::RotationMotor(Self::target_motor(constraint, row, value, tau, damping)),
                    )
                }
                ConstraintType::LinearVelocityMotor => {
                    let axis = frame_a.orientation * Vec3::AXES[axis_index];
                    let row = bodies.linear_row(axis, frame_a.position, frame_b.position, velocity_a, velocity_b);
                    (
                        JacobianType::LinearVelocityMotor,
                        JacobianData::LinearVelocityMotor(VelocityMotorJacobian::new(
                            row,
                            constraint.target[axis_index],
                            constraint.max_impulse[axis_index],
                            damping,
                        )),
                    )
                }
                ConstraintType::AngularVelocityMotor => {
                    let axis = frame_a.orientation * Vec3::AXES[axis_index];
                    let row = bodies.angular_row(axis, velocity_a, velocity_b);
                    (
                        JacobianType::AngularVelocityMotor,
                        JacobianData::AngularVelocityMotor(VelocityMotorJacobian::new(
                            row,
                            constraint.target[axis_index],
                            constraint.max_impulse[axis_index],
                            damping,
                        )),
                    )
                }
            };

            let flags = if constraint.should_raise_impulse_events() {
                JacobianFlags::ENABLE_IMPULSE_EVENTS
            } else {
                JacobianFlags::NONE
            };
            output.push(Jacobian {
                header: JacobianHeader {
                    body_pair: joint.body_pair,
                    kind,
                    flags,
                    joint_index: Some(joint_index),
                },
                data,
            });
        }
    }

    fn target_motor(
        constraint: &Constraint,
        row: JacobianRow,
        value: f32,
        tau: f32,
        damping: f32,
    ) -> TargetMotorJacobian {
        let axis_index = constraint.axis_index();
        TargetMotorJacobian::new(
            row,
            value,
            constraint.target[axis_index],
            constraint.max_impulse[axis_index],
            tau,
            damping,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::{MotionVelocity, RigidPose};
    use crate::physics::constraints::joint::BodyFrame;
    use crate::physics::events::SimulationEvents;
    use crate::physics::handles::BodyIndexPair;
    use crate::physics::solver::StepInput;

    fn dynamic_state(position: Vec3) -> JacobianBodyState {
        JacobianBodyState {
            world_from_body: RigidPose::from_position(position),
            world_from_motion: RigidPose::from_position(position),
            velocity: MotionVelocity {
                inverse_mass: 1.0,
                inverse_inertia: Vec3::ONE,
                ..MotionVelocity::ZERO
            },
        }
    }

    #[test]
    fn ball_and_socket_error_is_anchor_distance() {
        let joint = Joint::ball_and_socket(BodyIndexPair::new(0, 1), Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO).unwrap();
        let a = JacobianBodyState::fixed(RigidPose::IDENTITY);
        let b = dynamic_state(Vec3::new(0.5, 0.3, 0.4));
        let mut jacobians = Vec::new();
        JointJacobianBuilder::build_jacobians(&joint, JointIndex(7), &a, &b, 1.0 / 50.0, 4, &mut jacobians);
        assert_eq!(jacobians.len(), 1);
        assert_eq!(jacobians[0].header.kind, JacobianType::LinearLimit);
        assert_eq!(jacobians[0].header.joint_index, Some(JointIndex(7)));
        assert!((jacobians[0].initial_error().unwrap() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn hinge_builds_two_dimensional_alignment() {
        let joint = Joint::hinge(BodyIndexPair::new(0, 1), BodyFrame::IDENTITY, BodyFrame::IDENTITY).unwrap();
        let a = dynamic_state(Vec3::ZERO);
        let b = dynamic_state(Vec3::ZERO);
        let mut jacobians = Vec::new();
        JointJacobianBuilder::build_jacobians(&joint, JointIndex(0), &a, &b, 1.0 / 50.0, 4, &mut jacobians);
        let kinds: Vec<_> = jacobians.iter().map(|j| j.header.kind).collect();
        assert_eq!(kinds, vec![JacobianType::AngularLimit2D, JacobianType::LinearLimit]);
        assert!(jacobians.iter().all(|j| j.initial_error() == Some(0.0)));
    }

    #[test]
    fn exceeding_max_impulse_raises_event() {
        let joint = Joint::new(
            BodyIndexPair::new(0, 1),
            BodyFrame::IDENTITY,
            BodyFrame::IDENTITY,
            &[Constraint::ball_and_socket().with_max_impulse(Vec3::splat(0.01))],
        )
        .unwrap();
        let a = JacobianBodyState::fixed(RigidPose::IDENTITY);
        let mut b = dynamic_state(Vec3::ZERO);
        b.velocity.linear_velocity = Vec3::new(0.0, -5.0, 0.0);
        let mut jacobians = Vec::new();
        JointJacobianBuilder::build_jacobians(&joint, JointIndex(3), &a, &b, 1.0 / 50.0, 2, &mut jacobians);
        assert!(jacobians[0].header.flags.contains(JacobianFlags::ENABLE_IMPULSE_EVENTS));

        let mut velocity_a = MotionVelocity::ZERO;
        let mut velocity_b = b.velocity;
        let mut events = SimulationEvents::default();
        for iteration in 0..2 {
            let step = StepInput::new(1.0 / 50.0, 2, iteration);
            jacobians[0].solve(&mut velocity_a, &mut velocity_b, &step, &mut events);
        }
        assert_eq!(events.impulse_events.len(), 1);
        assert_eq!(events.impulse_events[0].joint_index, JointIndex(3));
        assert!(events.impulse_events[0].impulse.y > 0.01);
    }
}
