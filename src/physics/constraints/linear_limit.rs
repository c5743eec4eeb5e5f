use glam::Vec3;

use crate::physics::body_properties::{MotionVelocity, RigidPose};
use crate::physics::events::SimulationEvents;
use crate::physics::solver::StepInput;

use super::constraint::Constraint;
use super::jacobian::{ImpulseEventTracker, JacobianBodies, JacobianHeader, SoftLimit};

/// Which part of the anchor separation a linear limit measures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinearLimitShape {
    /// Signed separation along a fixed world axis.
    Axis(Vec3),
    /// Distance of anchor B from the line through anchor A along `free_axis`.
    Line { free_axis: Vec3 },
    /// Distance between the anchors.
    Point,
}

/// Keeps the separation of two anchors within a range along one, two or three axes of joint frame A.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearLimitJacobian {
    pub limit: SoftLimit,
    pub bodies: JacobianBodies,
    /// World position of the anchor on A at the start of the step.
    pub anchor_a: Vec3,
    /// World position of the anchor on B at the start of the step.
    pub anchor_b: Vec3,
    pub shape: LinearLimitShape,
    pub impulse_events: ImpulseEventTracker,
}

impl LinearLimitJacobian {
    /// `frame_a` and `frame_b` are the joint frames in world space.
    pub fn build(
        constraint: &Constraint,
        frame_a: &RigidPose,
        frame_b: &RigidPose,
        bodies: JacobianBodies,
        tau: f32,
        damping: f32,
    ) -> Self {
        let diff = frame_b.position - frame_a.position;
        let axis_index = constraint.axis_index();
        let axis = frame_a.orientation * Vec3::AXES[axis_index];
        let (shape, value) = match constraint.dimension() {
            1 => (LinearLimitShape::Axis(axis), diff.dot(axis)),
            2 => (
                LinearLimitShape::Line { free_axis: axis },
                (diff - axis * axis.dot(diff)).length(),
            ),
            _ => (LinearLimitShape::Point, diff.length()),
        };
        Self {
            limit: SoftLimit::new(value, constraint.min, constraint.max, tau, damping),
            bodies,
            anchor_a: frame_a.position,
            anchor_b: frame_b.position,
            shape,
            impulse_events: ImpulseEventTracker::new(
                constraint.kind,
                frame_a.orientation,
                constraint.constrained_axes,
                constraint.max_impulse,
            ),
        }
    }

    /// Direction of the constrained separation, taken from the separation predicted at the end of the step.
    fn direction(&self, diff: Vec3, predicted_diff: Vec3) -> Option<Vec3> {
        match self.shape {
            LinearLimitShape::Axis(axis) => Some(axis),
            LinearLimitShape::Line { free_axis } => {
                let off_axis = |v: Vec3| v - free_axis * free_axis.dot(v);
                off_axis(predicted_diff).try_normalize().or_else(|| off_axis(diff).try_normalize())
            }
            LinearLimitShape::Point => predicted_diff.try_normalize().or_else(|| diff.try_normalize()),
        }
    }

    pub fn solve(
        &mut self,
        header: &JacobianHeader,
        velocity_a: &mut MotionVelocity,
        velocity_b: &mut MotionVelocity,
        step: &StepInput,
        events: &mut SimulationEvents,
    ) {
        let timestep = step.timestep;
        let diff = self.anchor_b - self.anchor_a;
        let relative_velocity =
            self.bodies.point_velocity_difference(self.anchor_a, self.anchor_b, velocity_a, velocity_b);
        if let Some(direction) = self.direction(diff, diff + relative_velocity * timestep) {
            let row = self.bodies.linear_row(direction, self.anchor_a, self.anchor_b, velocity_a, velocity_b);
            let rate = row.relative_velocity(velocity_a, velocity_b);
            let impulse = self.limit.delta_rate(diff.dot(direction), rate, timestep) * row.effective_mass;
            row.apply_impulse(impulse, velocity_a, velocity_b);
            self.impulse_events.accumulate(direction * impulse);
        }
        self.impulse_events.finish(header, step, events);
    }
}
