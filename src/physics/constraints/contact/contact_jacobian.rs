use glam::Vec3;

use crate::physics::body_properties::MotionVelocity;
use crate::physics::collision_detection::contact_manifold::ContactManifold;
use crate::physics::constraints::inequality_helpers::InequalityHelpers;
use crate::physics::constraints::jacobian::{JacobianBodies, JacobianFlags, JacobianHeader, JacobianRow};
use crate::physics::events::{CollisionEvent, SimulationEvents, TriggerEvent};
use crate::physics::solver::StepInput;

/// Per step contact parameters taken from the step configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSettings {
    pub timestep: f32,
    /// Fraction of the penetration removed per step.
    pub contact_tau: f32,
    /// Largest separating velocity used to resolve penetration.
    pub max_depenetration_velocity: f32,
}

/// Rows of one contact point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPointRows {
    pub normal: JacobianRow,
    pub friction: [JacobianRow; 2],
    /// Separating velocity the normal row must reach.
    pub velocity_to_reach: f32,
    /// Separation at the start of the step; negative when penetrating.
    pub distance: f32,
    pub accumulated_normal_impulse: f32,
    pub accumulated_friction_impulse: [f32; 2],
}

/// Non-penetration and friction for one contact manifold.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactJacobian {
    /// Points from body B to body A.
    pub normal: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub points: Vec<ContactPointRows>,
}

#[inline(always)]
fn tangents(normal: Vec3) -> [Vec3; 2] {
    let (t0, t1) = normal.any_orthonormal_pair();
    [t0, t1]
}

impl ContactJacobian {
    pub fn build(
        manifold: &ContactManifold,
        bodies: &JacobianBodies,
        velocity_a: &MotionVelocity,
        velocity_b: &MotionVelocity,
        friction: f32,
        restitution: f32,
        settings: &ContactSettings,
    ) -> Self {
        let normal = manifold.normal;
        let tangents = tangents(normal);
        let inverse_timestep = 1.0 / settings.timestep;
        let points = manifold
            .points()
            .iter()
            .map(|point| {
                let point_b = point.position;
                let point_a = point.position - normal * point.depth;
                let normal_row = bodies.linear_row(-normal, point_a, point_b, velocity_a, velocity_b);
                let distance = -point.depth;
                let mut velocity_to_reach = if distance >= 0.0 {
                    -distance * inverse_timestep
                } else {
                    InequalityHelpers::compute_bias_velocity(
                        -distance * settings.contact_tau,
                        inverse_timestep,
                        settings.max_depenetration_velocity,
                    )
                };
                let approach = normal_row.relative_velocity(velocity_a, velocity_b);
                if restitution > 0.0 && approach < 0.0 && distance + approach * settings.timestep < 0.0 {
                    velocity_to_reach = velocity_to_reach.max(-restitution * approach);
                }
                ContactPointRows {
                    normal: normal_row,
                    friction: tangents.map(|tangent| bodies.linear_row(tangent, point_a, point_b, velocity_a, velocity_b)),
                    velocity_to_reach,
                    distance,
                    accumulated_normal_impulse: 0.0,
                    accumulated_friction_impulse: [0.0; 2],
                }
            })
            .collect();
        Self {
            normal,
            friction,
            restitution,
            points,
        }
    }

    pub fn total_normal_impulse(&self) -> f32 {
        self.points.iter().map(|point| point.accumulated_normal_impulse).sum()
    }

    pub fn solve(
        &mut self,
        header: &JacobianHeader,
        velocity_a: &mut MotionVelocity,
        velocity_b: &mut MotionVelocity,
        step: &StepInput,
        events: &mut SimulationEvents,
    ) {
        for point in &mut self.points {
            let rate = point.normal.relative_velocity(velocity_a, velocity_b);
            let impulse = (point.velocity_to_reach - rate) * point.normal.effective_mass;
            let impulse = InequalityHelpers::clamp_positive(&mut point.accumulated_normal_impulse, impulse);
            point.normal.apply_impulse(impulse, velocity_a, velocity_b);
        }

        for point in &mut self.points {
            let max_friction = self.friction * point.accumulated_normal_impulse;
            for (row, accumulated) in point.friction.iter().zip(point.accumulated_friction_impulse.iter_mut()) {
                let impulse = -row.relative_velocity(velocity_a, velocity_b) * row.effective_mass;
                let impulse = InequalityHelpers::clamp_symmetric(accumulated, impulse, max_friction);
                row.apply_impulse(impulse, velocity_a, velocity_b);
            }
        }

        if step.is_last_iteration() && header.flags.contains(JacobianFlags::ENABLE_COLLISION_EVENTS) {
            let accumulated_impulse = self.total_normal_impulse();
            if accumulated_impulse > 0.0 {
                events.collision_events.push(CollisionEvent {
                    body_pair: header.body_pair,
                    normal: self.normal,
                    contact_count: self.points.len(),
                    accumulated_impulse,
                });
            }
        }
    }
}

/// Overlap test for a pair involving a trigger. Applies no impulses.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerJacobian {
    /// Separating rows and start of step separations of the manifold points.
    pub points: Vec<(JacobianRow, f32)>,
}

impl TriggerJacobian {
    pub fn build(
        manifold: &ContactManifold,
        bodies: &JacobianBodies,
        velocity_a: &MotionVelocity,
        velocity_b: &MotionVelocity,
    ) -> Self {
        let normal = manifold.normal;
        let points = manifold
            .points()
            .iter()
            .map(|point| {
                let point_a = point.position - normal * point.depth;
                let row = bodies.linear_row(-normal, point_a, point.position, velocity_a, velocity_b);
                (row, -point.depth)
            })
            .collect();
        Self { points }
    }

    /// Raises a trigger event on the final iteration if any point is predicted to overlap at the end of the
    /// step.
    pub fn solve(
        &mut self,
        header: &JacobianHeader,
        velocity_a: &mut MotionVelocity,
        velocity_b: &mut MotionVelocity,
        step: &StepInput,
        events: &mut SimulationEvents,
    ) {
        if !step.is_last_iteration() {
            return;
        }
        let overlapping = self
            .points
            .iter()
            .any(|(row, distance)| distance + row.relative_velocity(velocity_a, velocity_b) * step.timestep < 0.0);
        if overlapping {
            events.trigger_events.push(TriggerEvent {
                body_pair: header.body_pair,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::RigidPose;
    use crate::physics::collision_detection::contact_manifold::ContactPoint;
    use crate::physics::constraints::jacobian::JacobianType;
    use crate::physics::handles::BodyIndexPair;

    fn resting_manifold(depth: f32) -> ContactManifold {
        let mut manifold = ContactManifold::new(Vec3::Y);
        for x in [-0.5, 0.5] {
            for z in [-0.5, 0.5] {
                manifold.push(ContactPoint {
                    position: Vec3::new(x, 0.0, z),
                    depth,
                });
            }
        }
        manifold
    }

    fn header() -> JacobianHeader {
        JacobianHeader {
            body_pair: BodyIndexPair::new(0, 1),
            kind: JacobianType::Contact,
            flags: JacobianFlags::ENABLE_COLLISION_EVENTS,
            joint_index: None,
        }
    }

    #[test]
    fn falling_box_stops_on_ground() {
        let bodies = JacobianBodies {
            world_from_motion_a: RigidPose::from_position(Vec3::new(0.0, 0.5, 0.0)),
            world_from_motion_b: RigidPose::IDENTITY,
        };
        let mut a = MotionVelocity {
            linear_velocity: Vec3::new(0.0, -3.0, 0.0),
            inverse_mass: 1.0,
            inverse_inertia: Vec3::splat(6.0),
            ..MotionVelocity::ZERO
        };
        let mut b = MotionVelocity::ZERO;
        let settings = ContactSettings {
            timestep: 1.0 / 60.0,
            contact_tau: 0.4,
            max_depenetration_velocity: 3.0,
        };
        let mut jacobian = ContactJacobian::build(&resting_manifold(0.0), &bodies, &a, &b, 0.5, 0.0, &settings);
        let mut events = SimulationEvents::default();
        for iteration in 0..8 {
            let step = StepInput::new(settings.timestep, 8, iteration);
            jacobian.solve(&header(), &mut a, &mut b, &step, &mut events);
        }
        assert!(a.linear_velocity.y.abs() < 1e-3, "{}", a.linear_velocity);
        assert!(a.angular_velocity.length() < 1e-3);
        assert_eq!(b, MotionVelocity::ZERO);
        assert_eq!(events.collision_events.len(), 1);
        assert_eq!(events.collision_events[0].contact_count, 4);
        assert!((events.collision_events[0].accumulated_impulse - 3.0).abs() < 1e-2);
    }

    #[test]
    fn separated_contact_allows_closing_the_gap() {
        let bodies = JacobianBodies {
            world_from_motion_a: RigidPose::from_position(Vec3::new(0.0, 1.0, 0.0)),
            world_from_motion_b: RigidPose::IDENTITY,
        };
        let mut a = MotionVelocity {
            linear_velocity: Vec3::new(0.0, -1.0, 0.0),
            inverse_mass: 1.0,
            ..MotionVelocity::ZERO
        };
        let mut b = MotionVelocity::ZERO;
        let settings = ContactSettings {
            timestep: 0.1,
            contact_tau: 0.4,
            max_depenetration_velocity: 3.0,
        };
        // 0.5 apart: moving 0.1 per step is allowed untouched.
        let mut jacobian = ContactJacobian::build(&resting_manifold(-0.5), &bodies, &a, &b, 0.5, 0.0, &settings);
        let step = StepInput::new(settings.timestep, 1, 0);
        jacobian.solve(&header(), &mut a, &mut b, &step, &mut SimulationEvents::default());
        assert_eq!(a.linear_velocity.y, -1.0);
    }

    #[test]
    fn trigger_reports_overlap_only() {
        let bodies = JacobianBodies {
            world_from_motion_a: RigidPose::IDENTITY,
            world_from_motion_b: RigidPose::IDENTITY,
        };
        let mut a = MotionVelocity {
            linear_velocity: Vec3::new(0.0, -1.0, 0.0),
            inverse_mass: 1.0,
            ..MotionVelocity::ZERO
        };
        let mut b = MotionVelocity::ZERO;
        let mut trigger = TriggerJacobian::build(&resting_manifold(0.1), &bodies, &a, &b);
        let mut events = SimulationEvents::default();
        trigger.solve(&header(), &mut a, &mut b, &StepInput::new(0.1, 1, 0), &mut events);
        assert_eq!(events.trigger_events.len(), 1);
        assert_eq!(a.linear_velocity.y, -1.0);
    }
}
