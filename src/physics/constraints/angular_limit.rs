use glam::{Quat, Vec3};

use crate::physics::body_properties::MotionVelocity;
use crate::physics::events::SimulationEvents;
use crate::physics::solver::StepInput;

use super::constraint::Constraint;
use super::jacobian::{
    relative_orientation, ImpulseEventTracker, JacobianBodies, JacobianHeader, JacobianRow, SoftLimit,
};

/// Twist of the relative orientation `q` about axis `axis_index`, together with the axis, in frame A, whose
/// dot product with the relative angular velocity is the twist rate.
///
/// `q` must have a non-negative scalar part; the twist is then within `[-pi, pi]`.
pub(crate) fn twist_angle_and_axis(q: Quat, axis_index: usize) -> (f32, Vec3) {
    let v = q.xyz();
    let (i, j, k) = (axis_index, (axis_index + 1) % 3, (axis_index + 2) % 3);
    let angle = 2.0 * v[i].atan2(q.w);
    let mut axis = Vec3::ZERO;
    axis[i] = 1.0;
    let denominator = q.w * q.w + v[i] * v[i];
    if denominator > 1e-12 {
        axis[j] = (q.w * v[k] + v[i] * v[j]) / denominator;
        axis[k] = (v[i] * v[k] - q.w * v[j]) / denominator;
    }
    (angle, axis)
}

/// Limits the twist of B relative to A about one axis of joint frame A.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularLimit1DJacobian {
    pub limit: SoftLimit,
    pub row: JacobianRow,
    /// World axis of the row.
    pub axis: Vec3,
    /// Twist at the start of the step.
    pub value: f32,
    pub impulse_events: ImpulseEventTracker,
}

impl AngularLimit1DJacobian {
    pub fn build(
        constraint: &Constraint,
        frame_a: Quat,
        frame_b: Quat,
        bodies: &JacobianBodies,
        velocity_a: &MotionVelocity,
        velocity_b: &MotionVelocity,
        tau: f32,
        damping: f32,
    ) -> Self {
        let (value, local_axis) = twist_angle_and_axis(relative_orientation(frame_a, frame_b), constraint.axis_index());
        let axis = frame_a * local_axis;
        Self {
            limit: SoftLimit::new(value, constraint.min, constraint.max, tau, damping),
            row: bodies.angular_row(axis, velocity_a, velocity_b),
            axis,
            value,
            impulse_events: ImpulseEventTracker::new(
                constraint.kind,
                frame_a,
                constraint.constrained_axes,
                constraint.max_impulse,
            ),
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
        let rate = self.row.relative_velocity(velocity_a, velocity_b);
        let impulse = self.limit.delta_rate(self.value, rate, step.timestep) * self.row.effective_mass;
        self.row.apply_impulse(impulse, velocity_a, velocity_b);
        self.impulse_events.accumulate(self.axis * impulse);
        self.impulse_events.finish(header, step, events);
    }
}

/// Limits the angle between the free axes of both joint frames.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularLimit2DJacobian {
    pub limit: SoftLimit,
    pub bodies: JacobianBodies,
    /// World free axis of frame A.
    pub axis_a: Vec3,
    /// World free axis of frame B.
    pub axis_b: Vec3,
    pub impulse_events: ImpulseEventTracker,
}

impl AngularLimit2DJacobian {
    pub fn build(
        constraint: &Constraint,
        frame_a: Quat,
        frame_b: Quat,
        bodies: JacobianBodies,
        tau: f32,
        damping: f32,
    ) -> Self {
        let free_axis = Vec3::AXES[constraint.axis_index()];
        let axis_a = frame_a * free_axis;
        let axis_b = frame_b * free_axis;
        let angle = axis_a.cross(axis_b).length().atan2(axis_a.dot(axis_b));
        Self {
            limit: SoftLimit::new(angle, constraint.min, constraint.max, tau, damping),
            bodies,
            axis_a,
            axis_b,
            impulse_events: ImpulseEventTracker::new(
                constraint.kind,
                frame_a,
                constraint.constrained_axes,
                constraint.max_impulse,
            ),
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
        let relative = self.bodies.angular_velocity_difference(velocity_a, velocity_b);
        let predicted_b = self.axis_b + relative.cross(self.axis_b) * timestep;
        let current = self.axis_a.cross(self.axis_b);
        if let Some(normal) = self.axis_a.cross(predicted_b).try_normalize().or_else(|| current.try_normalize()) {
            let value = current.dot(normal).atan2(self.axis_a.dot(self.axis_b));
            let row = self.bodies.angular_row(normal, velocity_a, velocity_b);
            let rate = row.relative_velocity(velocity_a, velocity_b);
            let impulse = self.limit.delta_rate(value, rate, timestep) * row.effective_mass;
            row.apply_impulse(impulse, velocity_a, velocity_b);
            self.impulse_events.accumulate(normal * impulse);
        }
        self.impulse_events.finish(header, step, events);
    }
}

/// Limits the total rotation angle of B relative to A.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularLimit3DJacobian {
    pub limit: SoftLimit,
    pub bodies: JacobianBodies,
    /// World orientation of frame A.
    pub frame_a: Quat,
    /// Orientation of frame B relative to frame A, with a non-negative scalar part.
    pub relative: Quat,
    pub impulse_events: ImpulseEventTracker,
}

impl AngularLimit3DJacobian {
    pub fn build(
        constraint: &Constraint,
        frame_a: Quat,
        frame_b: Quat,
        bodies: JacobianBodies,
        tau: f32,
        damping: f32,
    ) -> Self {
        let relative = relative_orientation(frame_a, frame_b);
        let angle = 2.0 * relative.xyz().length().atan2(relative.w);
        Self {
            limit: SoftLimit::new(angle, constraint.min, constraint.max, tau, damping),
            bodies,
            frame_a,
            relative,
            impulse_events: ImpulseEventTracker::new(
                constraint.kind,
                frame_a,
                constraint.constrained_axes,
                constraint.max_impulse,
            ),
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
        let relative_velocity = self.frame_a.conjugate() * self.bodies.angular_velocity_difference(velocity_a, velocity_b);
        let mut predicted = (Quat::from_scaled_axis(relative_velocity * timestep) * self.relative).normalize();
        if predicted.w < 0.0 {
            predicted = -predicted;
        }
        let local_axis = predicted.xyz().try_normalize().or_else(|| self.relative.xyz().try_normalize());
        if let Some(local_axis) = local_axis {
            let value = 2.0 * self.relative.xyz().dot(local_axis).atan2(self.relative.w);
            let axis = self.frame_a * local_axis;
            let row = self.bodies.angular_row(axis, velocity_a, velocity_b);
            let rate = row.relative_velocity(velocity_a, velocity_b);
            let impulse = self.limit.delta_rate(value, rate, timestep) * row.effective_mass;
            row.apply_impulse(impulse, velocity_a, velocity_b);
            self.impulse_events.accumulate(axis * impulse);
        }
        self.impulse_events.finish(header, step, events);
    }
}
