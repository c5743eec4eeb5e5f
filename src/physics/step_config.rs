use glam::Vec3;

use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::utilities::thread_dispatcher::SimpleThreadDispatcher;

/// Parameters of one simulation step, passed explicitly to every step call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepConfig {
    /// Duration of the step in seconds.
    pub timestep: f32,
    pub gravity: Vec3,
    pub solver_iteration_count: u32,
    /// Whether the broad phase builds its trees on worker threads and the narrow phase and solver spread batches
    /// over `thread_count` workers.
    pub multi_threaded: bool,
    /// Workers used when `multi_threaded` is set. Zero runs every stage on the calling thread.
    pub thread_count: usize,
    /// Distance under which separated bodies still produce contacts.
    pub collision_tolerance: f32,
    /// Fraction of the penetration removed per step, in `[0, 1]`.
    pub contact_tau: f32,
    /// Largest velocity used to push penetrating bodies apart.
    pub max_depenetration_velocity: f32,
    /// Rebuilds the static tree even if the static body count did not change.
    pub build_static_tree: bool,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            solver_iteration_count: 4,
            multi_threaded: false,
            thread_count: std::thread::available_parallelism().map(|count| count.get()).unwrap_or(1),
            collision_tolerance: 0.1,
            contact_tau: 0.4,
            max_depenetration_velocity: 3.0,
            build_static_tree: true,
        }
    }
}

impl StepConfig {
    pub fn with_timestep(mut self, timestep: f32) -> Self {
        self.timestep = timestep;
        self
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_solver_iteration_count(mut self, solver_iteration_count: u32) -> Self {
        self.solver_iteration_count = solver_iteration_count;
        self
    }

    /// Runs multithreaded on `thread_count` workers.
    pub fn with_threads(mut self, thread_count: usize) -> Self {
        self.multi_threaded = true;
        self.thread_count = thread_count;
        self
    }

    pub fn single_threaded(mut self) -> Self {
        self.multi_threaded = false;
        self
    }

    pub fn with_collision_tolerance(mut self, collision_tolerance: f32) -> Self {
        self.collision_tolerance = collision_tolerance;
        self
    }

    pub fn with_contact_tau(mut self, contact_tau: f32) -> Self {
        self.contact_tau = contact_tau;
        self
    }

    pub fn with_max_depenetration_velocity(mut self, max_depenetration_velocity: f32) -> Self {
        self.max_depenetration_velocity = max_depenetration_velocity;
        self
    }

    pub fn with_build_static_tree(mut self, build_static_tree: bool) -> Self {
        self.build_static_tree = build_static_tree;
        self
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "timestep must be finite and positive",
            });
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "gravity must be finite",
            });
        }
        if self.solver_iteration_count == 0 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "at least one solver iteration is required",
            });
        }
        if !(self.collision_tolerance.is_finite() && self.collision_tolerance >= 0.0) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "collision tolerance must be finite and non-negative",
            });
        }
        if !(0.0..=1.0).contains(&self.contact_tau) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "contact tau must lie in [0, 1]",
            });
        }
        if self.max_depenetration_velocity.is_nan() || self.max_depenetration_velocity < 0.0 {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "max depenetration velocity must be non-negative",
            });
        }
        Ok(())
    }

    /// Dispatcher for the parallel stages, or `None` when the step runs single threaded.
    pub fn dispatcher(&self) -> Option<SimpleThreadDispatcher> {
        self.multi_threaded.then(|| SimpleThreadDispatcher::new(self.thread_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(StepConfig::default().validate(), Ok(()));
    }

    #[test]
    fn builders_set_fields() {
        let config = StepConfig::default()
            .with_timestep(0.02)
            .with_gravity(Vec3::ZERO)
            .with_solver_iteration_count(8)
            .with_threads(4)
            .with_build_static_tree(false);
        assert_eq!(config.timestep, 0.02);
        assert_eq!(config.gravity, Vec3::ZERO);
        assert_eq!(config.solver_iteration_count, 8);
        assert!(config.multi_threaded);
        assert_eq!(config.thread_count, 4);
        assert!(!config.build_static_tree);
        assert!(config.dispatcher().is_some());
        assert!(config.single_threaded().dispatcher().is_none());
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            StepConfig::default().with_timestep(0.0),
            StepConfig::default().with_timestep(f32::NAN),
            StepConfig::default().with_gravity(Vec3::new(0.0, f32::INFINITY, 0.0)),
            StepConfig::default().with_solver_iteration_count(0),
            StepConfig::default().with_collision_tolerance(-0.1),
            StepConfig::default().with_contact_tau(1.5),
            StepConfig::default().with_max_depenetration_velocity(f32::NAN),
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(PhysicsError::InvalidConfiguration { .. })), "{config:?}");
        }
    }
}
