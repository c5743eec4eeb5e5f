use glam::{BVec3, Vec3};

use super::spring_settings::JacobianUtilities;

/// What a constraint restricts and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    /// Keeps the anchor separation within `[min, max]` along the constrained axes.
    Linear,
    /// Keeps the relative rotation within `[min, max]` about the constrained axes.
    Angular,
    /// Drives the anchor separation along one axis toward `target`.
    PositionMotor,
    /// Drives the relative rotation about one axis toward `target`.
    RotationMotor,
    /// Drives the relative linear velocity along one axis toward `target`.
    LinearVelocityMotor,
    /// Drives the relative angular velocity about one axis toward `target`.
    AngularVelocityMotor,
}

impl ConstraintType {
    #[inline(always)]
    pub fn is_motor(self) -> bool {
        !matches!(self, ConstraintType::Linear | ConstraintType::Angular)
    }
}

/// One scalar or multi axis restriction between the joint frames of two bodies.
///
/// Axes refer to joint frame A: 0 is the frame's axis, 1 its perpendicular axis, 2 their cross product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub constrained_axes: BVec3,
    pub kind: ConstraintType,
    pub min: f32,
    pub max: f32,
    pub spring_frequency: f32,
    pub damping_ratio: f32,
    /// Largest impulse the constraint may apply per axis. Limits report an impulse event when exceeded;
    /// motors clamp to it.
    pub max_impulse: Vec3,
    /// Motor target per axis.
    pub target: Vec3,
}

impl Default for Constraint {
    fn default() -> Self {
        Self {
            constrained_axes: BVec3::TRUE,
            kind: ConstraintType::Linear,
            min: 0.0,
            max: 0.0,
            spring_frequency: JacobianUtilities::DEFAULT_SPRING_FREQUENCY,
            damping_ratio: JacobianUtilities::DEFAULT_DAMPING_RATIO,
            max_impulse: Vec3::INFINITY,
            target: Vec3::ZERO,
        }
    }
}

#[inline(always)]
fn single_axis(index: usize) -> BVec3 {
    BVec3::new(index == 0, index == 1, index == 2)
}

#[inline(always)]
fn all_but(index: usize) -> BVec3 {
    BVec3::new(index != 0, index != 1, index != 2)
}

impl Constraint {
    /// Number of constrained axes.
    #[inline(always)]
    pub fn dimension(&self) -> usize {
        self.constrained_axes.bitmask().count_ones() as usize
    }

    /// Index of the single constrained axis of a one dimensional constraint, or of the single free axis of a
    /// two dimensional one.
    pub fn axis_index(&self) -> usize {
        let mask = self.constrained_axes.bitmask();
        let wanted = if self.dimension() == 2 { !mask & 0b111 } else { mask };
        wanted.trailing_zeros().min(2) as usize
    }

    /// Whether exceeding `max_impulse` is worth reporting. Motors never report, and neither do constraints
    /// whose constrained axes all allow infinite impulses.
    pub fn should_raise_impulse_events(&self) -> bool {
        if self.kind.is_motor() {
            return false;
        }
        (0..3).any(|axis| self.constrained_axes.test(axis) && self.max_impulse[axis] != f32::INFINITY)
    }

    #[inline(always)]
    pub fn with_spring(mut self, frequency: f32, damping_ratio: f32) -> Self {
        self.spring_frequency = frequency;
        self.damping_ratio = damping_ratio;
        self
    }

    #[inline(always)]
    pub fn with_max_impulse(mut self, max_impulse: Vec3) -> Self {
        self.max_impulse = max_impulse;
        self
    }

    /// Pins the anchors together.
    pub fn ball_and_socket() -> Self {
        Self::default()
    }

    /// Locks the relative orientation.
    pub fn fixed_angle() -> Self {
        Self {
            kind: ConstraintType::Angular,
            ..Self::default()
        }
    }

    /// Keeps the free axes of both frames aligned; rotation about the free axis stays unconstrained.
    pub fn hinge(free_axis_index: usize) -> Self {
        Self {
            constrained_axes: all_but(free_axis_index),
            kind: ConstraintType::Angular,
            ..Self::default()
        }
    }

    /// Limits the angle between the free axes of both frames.
    pub fn cone(free_axis_index: usize, min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            ..Self::hinge(free_axis_index)
        }
    }

    /// Limits the rotation about one axis.
    pub fn twist(limited_axis_index: usize, min: f32, max: f32) -> Self {
        Self {
            constrained_axes: single_axis(limited_axis_index),
            kind: ConstraintType::Angular,
            min,
            max,
            ..Self::default()
        }
    }

    /// Limits the anchor separation along one axis.
    pub fn planar(limited_axis_index: usize, min: f32, max: f32) -> Self {
        Self {
            constrained_axes: single_axis(limited_axis_index),
            min,
            max,
            ..Self::default()
        }
    }

    /// Limits the distance of anchor B from the line through anchor A along the free axis.
    pub fn cylindrical(free_axis_index: usize, min: f32, max: f32) -> Self {
        Self {
            constrained_axes: all_but(free_axis_index),
            min,
            max,
            ..Self::default()
        }
    }

    /// Limits the distance between the anchors.
    pub fn limited_distance(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    pub fn position_motor(axis_index: usize, target: f32, max_impulse: f32) -> Self {
        Self::motor(ConstraintType::PositionMotor, axis_index, target, max_impulse)
    }

    pub fn rotation_motor(axis_index: usize, target: f32, max_impulse: f32) -> Self {
        Self::motor(ConstraintType::RotationMotor, axis_index, target, max_impulse)
    }

    pub fn linear_velocity_motor(axis_index: usize, target: f32, max_impulse: f32) -> Self {
        Self::motor(ConstraintType::LinearVelocityMotor, axis_index, target, max_impulse)
    }

    pub fn angular_velocity_motor(axis_index: usize, target: f32, max_impulse: f32) -> Self {
        Self::motor(ConstraintType::AngularVelocityMotor, axis_index, target, max_impulse)
    }

    fn motor(kind: ConstraintType, axis_index: usize, target: f32, max_impulse: f32) -> Self {
        let axes = single_axis(axis_index);
        Self {
            constrained_axes: axes,
            kind,
            target: Vec3::select(axes, Vec3::splat(target), Vec3::ZERO),
            max_impulse: Vec3::select(axes, Vec3::splat(max_impulse), Vec3::INFINITY),
            ..Self::default()
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.dimension() > 0
            && !self.min.is_nan()
            && !self.max.is_nan()
            && self.min <= self.max
            && self.spring_frequency >= 0.0
            && self.damping_ratio >= 0.0
            && !self.max_impulse.is_nan()
            && (!self.kind.is_motor() || self.dimension() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impulse_event_gating() {
        let inf = f32::INFINITY;
        let cases = [
            (Vec3::new(inf, inf, inf), false),
            (Vec3::new(1.0, inf, inf), true),
            (Vec3::new(inf, 1.0, inf), true),
            (Vec3::new(inf, inf, 1.0), true),
            (Vec3::new(-1.0, -2.0, -3.0), true),
            (Vec3::new(-1.0, 2.0, inf), true),
            (Vec3::new(1.0, 2.0, 3.0), true),
            (Vec3::new(-inf, -inf, -inf), true),
        ];
        for (max_impulse, expected) in cases {
            for constraint in [Constraint::ball_and_socket(), Constraint::fixed_angle()] {
                let constraint = constraint.with_max_impulse(max_impulse);
                assert_eq!(constraint.should_raise_impulse_events(), expected, "{max_impulse}");
            }
        }
    }

    #[test]
    fn motors_never_raise_impulse_events() {
        for constraint in [
            Constraint::position_motor(0, 1.0, 5.0),
            Constraint::rotation_motor(0, 1.0, 5.0),
            Constraint::linear_velocity_motor(0, 1.0, 5.0),
            Constraint::angular_velocity_motor(0, 1.0, 5.0),
        ] {
            assert!(constraint.max_impulse.x.is_finite());
            assert!(!constraint.should_raise_impulse_events());
            assert!(!constraint.with_max_impulse(Vec3::ONE).should_raise_impulse_events());
        }
    }

    #[test]
    fn unconstrained_axes_do_not_gate_events() {
        let twist = Constraint::twist(1, -0.5, 0.5).with_max_impulse(Vec3::new(1.0, f32::INFINITY, 1.0));
        assert!(!twist.should_raise_impulse_events());
        let twist = twist.with_max_impulse(Vec3::new(f32::INFINITY, 2.0, f32::INFINITY));
        assert!(twist.should_raise_impulse_events());
    }

    #[test]
    fn axis_index_of_one_and_two_dimensional_constraints() {
        assert_eq!(Constraint::twist(2, 0.0, 0.0).axis_index(), 2);
        assert_eq!(Constraint::hinge(1).axis_index(), 1);
        assert_eq!(Constraint::hinge(1).dimension(), 2);
        assert_eq!(Constraint::fixed_angle().dimension(), 3);
    }
}
