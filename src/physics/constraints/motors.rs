use crate::physics::body_properties::MotionVelocity;
use crate::physics::solver::StepInput;

use super::inequality_helpers::InequalityHelpers;
use super::jacobian::{JacobianRow, SoftLimit};

/// Drives a position or angle along a single row toward a target, with the accumulated impulse limited to
/// `max_impulse` in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetMotorJacobian {
    /// Limit collapsed onto the target.
    pub limit: SoftLimit,
    pub row: JacobianRow,
    /// Position or angle at the start of the step.
    pub value: f32,
    pub max_impulse: f32,
    pub accumulated_impulse: f32,
}

impl TargetMotorJacobian {
    pub fn new(row: JacobianRow, value: f32, target: f32, max_impulse: f32, tau: f32, damping: f32) -> Self {
        Self {
            limit: SoftLimit::new(value, target, target, tau, damping),
            row,
            value,
            max_impulse,
            accumulated_impulse: 0.0,
        }
    }

    pub fn solve(&mut self, velocity_a: &mut MotionVelocity, velocity_b: &mut MotionVelocity, step: &StepInput) {
        let rate = self.row.relative_velocity(velocity_a, velocity_b);
        let impulse = self.limit.delta_rate(self.value, rate, step.timestep) * self.row.effective_mass;
        let impulse = InequalityHelpers::clamp_symmetric(&mut self.accumulated_impulse, impulse, self.max_impulse);
        self.row.apply_impulse(impulse, velocity_a, velocity_b);
    }
}

/// Drives the rate of a single row toward a target velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityMotorJacobian {
    pub row: JacobianRow,
    pub target: f32,
    pub max_impulse: f32,
    /// Fraction of the velocity error removed per iteration.
    pub damping: f32,
    pub accumulated_impulse: f32,
}

impl VelocityMotorJacobian {
    pub fn new(row: JacobianRow, target: f32, max_impulse: f32, damping: f32) -> Self {
        Self {
            row,
            target,
            max_impulse,
            damping,
            accumulated_impulse: 0.0,
        }
    }

    pub fn solve(&mut self, velocity_a: &mut MotionVelocity, velocity_b: &mut MotionVelocity) {
        let rate = self.row.relative_velocity(velocity_a, velocity_b);
        let impulse = (self.target - rate) * self.damping * self.row.effective_mass;
        let impulse = InequalityHelpers::clamp_symmetric(&mut self.accumulated_impulse, impulse, self.max_impulse);
        self.row.apply_impulse(impulse, velocity_a, velocity_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn body(inverse_mass: f32) -> MotionVelocity {
        MotionVelocity {
            inverse_mass,
            inverse_inertia: Vec3::splat(inverse_mass),
            ..MotionVelocity::ZERO
        }
    }

    #[test]
    fn velocity_motor_reaches_target_when_unclamped() {
        let mut a = MotionVelocity::ZERO;
        let mut b = body(1.0);
        let row = JacobianRow::new(Vec3::X, Vec3::ZERO, Vec3::ZERO, &a, &b);
        let mut motor = VelocityMotorJacobian::new(row, 2.0, f32::INFINITY, 1.0);
        motor.solve(&mut a, &mut b);
        assert!((b.linear_velocity.x - 2.0).abs() < 1e-6);
        assert_eq!(a.linear_velocity, Vec3::ZERO);
    }

    #[test]
    fn velocity_motor_respects_max_impulse() {
        let mut a = MotionVelocity::ZERO;
        let mut b = body(0.5);
        let row = JacobianRow::new(Vec3::X, Vec3::ZERO, Vec3::ZERO, &a, &b);
        let mut motor = VelocityMotorJacobian::new(row, 10.0, 1.0, 1.0);
        for _ in 0..4 {
            motor.solve(&mut a, &mut b);
        }
        assert_eq!(motor.accumulated_impulse, 1.0);
        assert!((b.linear_velocity.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn target_motor_is_clamped() {
        let mut a = MotionVelocity::ZERO;
        let mut b = body(1.0);
        let row = JacobianRow::new(Vec3::X, Vec3::ZERO, Vec3::ZERO, &a, &b);
        let mut motor = TargetMotorJacobian::new(row, 0.0, 5.0, 0.25, 0.6, 0.9);
        let step = StepInput::new(1.0 / 50.0, 4, 0);
        motor.solve(&mut a, &mut b, &step);
        assert_eq!(motor.accumulated_impulse, 0.25);
        assert!((b.linear_velocity.x - 0.25).abs() < 1e-6);
    }
}
