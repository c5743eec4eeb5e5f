use glam::{Quat, Vec3};

use crate::physics::body_properties::{MotionData, MotionVelocity, RigidPose};

/// Provides helper functions for integrating body poses.
pub struct PoseIntegration;

impl PoseIntegration {
    /// Integrates a position by linear velocity over dt.
    #[inline(always)]
    pub fn integrate_position(position: Vec3, linear_velocity: Vec3, dt: f32) -> Vec3 {
        position + linear_velocity * dt
    }

    /// Integrates an orientation by an angular velocity expressed in the orientation's local frame.
    #[inline(always)]
    pub fn integrate_orientation(orientation: Quat, local_angular_velocity: Vec3, dt: f32) -> Quat {
        // Piecewise constant angular velocity; no gyroscopic term.
        let speed = local_angular_velocity.length();
        if speed > 1e-15f32 {
            let half_angle = speed * dt * 0.5;
            let scale = half_angle.sin() / speed;
            let q = Quat::from_xyzw(
                local_angular_velocity.x * scale,
                local_angular_velocity.y * scale,
                local_angular_velocity.z * scale,
                half_angle.cos(),
            );
            (orientation * q).normalize()
        } else {
            orientation
        }
    }

    /// Integrates a motion frame over one step.
    #[inline(always)]
    pub fn integrate_motion(world_from_motion: RigidPose, velocity: &MotionVelocity, dt: f32) -> RigidPose {
        RigidPose {
            position: Self::integrate_position(world_from_motion.position, velocity.linear_velocity, dt),
            orientation: Self::integrate_orientation(world_from_motion.orientation, velocity.angular_velocity, dt),
        }
    }

    /// Applies gravity and damping to the velocities before solving. Infinite mass bodies keep their velocity.
    pub fn apply_gravity_and_damping(
        motion_datas: &[MotionData],
        motion_velocities: &mut [MotionVelocity],
        gravity: Vec3,
        dt: f32,
    ) {
        for (data, velocity) in motion_datas.iter().zip(motion_velocities.iter_mut()) {
            if velocity.has_infinite_mass() {
                continue;
            }
            velocity.linear_velocity += gravity * (velocity.gravity_factor * dt);
            velocity.linear_velocity *= (1.0 - data.linear_damping * dt).clamp(0.0, 1.0);
            velocity.angular_velocity *= (1.0 - data.angular_damping * dt).clamp(0.0, 1.0);
        }
    }

    /// Moves every motion frame by its solved velocity.
    pub fn integrate(motion_datas: &mut [MotionData], motion_velocities: &[MotionVelocity], dt: f32) {
        for (data, velocity) in motion_datas.iter_mut().zip(motion_velocities) {
            data.world_from_motion = Self::integrate_motion(data.world_from_motion, velocity, dt);
        }
    }
}
