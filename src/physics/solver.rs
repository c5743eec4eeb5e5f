use tracing::trace;

use crate::physics::body_properties::MotionVelocity;
use crate::physics::constraints::jacobian::{Jacobian, JacobianIterator};
use crate::physics::events::SimulationEvents;
use crate::physics::solver_scheduler_info::{SolverSchedulerInfo, SEQUENTIAL_PHASE_INDEX};
use crate::utilities::memory::DisjointBuffer;
use crate::utilities::thread_dispatcher::{for_each_job, ThreadDispatcher};

/// Per iteration inputs of the jacobian solve functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    pub timestep: f32,
    pub inverse_timestep: f32,
    pub iteration_count: u32,
    /// Zero based index of the iteration being solved.
    pub current_iteration: u32,
}

impl StepInput {
    pub fn new(timestep: f32, iteration_count: u32, current_iteration: u32) -> Self {
        Self {
            timestep,
            inverse_timestep: if timestep > 0.0 { 1.0 / timestep } else { 0.0 },
            iteration_count,
            current_iteration,
        }
    }

    /// Events are only raised on the last iteration.
    #[inline(always)]
    pub fn is_last_iteration(&self) -> bool {
        self.current_iteration + 1 >= self.iteration_count
    }
}

/// Gauss-Seidel solver over a phased jacobian stream.
///
/// `jacobians[i]` holds the jacobians built for batch `i` of the schedule, in dispatch pair order. Batches of a
/// parallel phase touch disjoint dynamic bodies and are solved concurrently; the sequential phase is solved on
/// the calling thread in sort order.
pub struct Solver;

impl Solver {
    /// Runs `iteration_count` iterations and returns the events raised by the last one, in batch order.
    pub fn solve(
        jacobians: &mut [Vec<Jacobian>],
        schedule: &SolverSchedulerInfo,
        motion_velocities: &mut [MotionVelocity],
        timestep: f32,
        iteration_count: u32,
        dispatcher: Option<&dyn ThreadDispatcher>,
    ) -> SimulationEvents {
        assert_eq!(
            jacobians.len(),
            schedule.batch_count(),
            "jacobian stream must hold one entry per scheduled batch"
        );
        let mut batch_events = vec![SimulationEvents::default(); jacobians.len()];
        for iteration in 0..iteration_count {
            let step = StepInput::new(timestep, iteration_count, iteration);
            Self::solve_iteration(jacobians, schedule, motion_velocities, &step, &mut batch_events, dispatcher);
        }

        let mut events = SimulationEvents::default();
        for batch in batch_events.iter_mut() {
            events.append(batch);
        }
        trace!(
            iterations = iteration_count,
            collision_events = events.collision_events.len(),
            trigger_events = events.trigger_events.len(),
            impulse_events = events.impulse_events.len(),
            "solved jacobians"
        );
        events
    }

    /// Solves every phase once, in increasing phase order.
    pub fn solve_iteration(
        jacobians: &mut [Vec<Jacobian>],
        schedule: &SolverSchedulerInfo,
        motion_velocities: &mut [MotionVelocity],
        step: &StepInput,
        batch_events: &mut [SimulationEvents],
        dispatcher: Option<&dyn ThreadDispatcher>,
    ) {
        let jacobian_batches = DisjointBuffer::new(jacobians);
        let event_batches = DisjointBuffer::new(batch_events);
        let velocities = DisjointBuffer::new(motion_velocities);

        for (phase_index, phase) in schedule.phase_info.iter().enumerate() {
            if phase.batch_count == 0 {
                continue;
            }
            if phase_index == SEQUENTIAL_PHASE_INDEX {
                debug_assert!(phase.contains_duplicate_indices);
                for batch_index in phase.batch_range() {
                    // SAFETY: the sequential phase runs on this thread only; nothing else holds a reference.
                    unsafe {
                        Self::solve_batch(
                            jacobian_batches.get_mut(batch_index),
                            &velocities,
                            step,
                            event_batches.get_mut(batch_index),
                        )
                    };
                }
            } else {
                let first_batch_index = phase.first_batch_index;
                for_each_job(dispatcher, phase.batch_count, &|job_index| {
                    let batch_index = first_batch_index + job_index;
                    // SAFETY: each batch index is claimed by one job and batches of a parallel phase reference
                    // disjoint dynamic bodies.
                    unsafe {
                        Self::solve_batch(
                            jacobian_batches.get_mut(batch_index),
                            &velocities,
                            step,
                            event_batches.get_mut(batch_index),
                        )
                    };
                });
            }
        }
    }

    /// Solves one batch's jacobians in order.
    ///
    /// # Safety
    /// No other thread may access the dynamic bodies referenced by the batch while it is solved.
    unsafe fn solve_batch(
        jacobians: &mut [Jacobian],
        velocities: &DisjointBuffer<MotionVelocity>,
        step: &StepInput,
        events: &mut SimulationEvents,
    ) {
        let mut iterator = JacobianIterator::new(jacobians);
        while iterator.has_more() {
            let Some(jacobian) = iterator.read_next() else {
                break;
            };
            let pair = jacobian.header.body_pair;
            assert_ne!(
                pair.body_index_a, pair.body_index_b,
                "jacobian references body {} twice",
                pair.body_index_a
            );
            let mut static_a = MotionVelocity::ZERO;
            let mut static_b = MotionVelocity::ZERO;
            let velocity_a = if pair.body_index_a < velocities.len() {
                velocities.get_mut(pair.body_index_a)
            } else {
                &mut static_a
            };
            let velocity_b = if pair.body_index_b < velocities.len() {
                velocities.get_mut(pair.body_index_b)
            } else {
                &mut static_b
            };
            jacobian.solve(velocity_a, velocity_b, step, events);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::physics::body_properties::RigidPose;
    use crate::physics::constraints::jacobian::JacobianBodyState;
    use crate::physics::constraints::joint::Joint;
    use crate::physics::constraints::joint_jacobian_builder::JointJacobianBuilder;
    use crate::physics::dispatch_pair_sequencer::{DispatchPairSequencer, PhasedDispatchPairs};
    use crate::physics::handles::BodyIndexPair;
    use crate::utilities::thread_dispatcher::SimpleThreadDispatcher;

    const TIMESTEP: f32 = 1.0 / 50.0;
    const ITERATIONS: u32 = 4;

    struct Scene {
        poses: Vec<RigidPose>,
        velocities: Vec<MotionVelocity>,
        joints: Vec<Joint>,
    }

    /// Dynamic bodies on a loose grid, each jointed to a few random neighbours and some to the single static
    /// body at the end.
    fn scene(seed: u64, num_dynamic: usize) -> Scene {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut poses = Vec::new();
        let mut velocities = Vec::new();
        for i in 0..num_dynamic {
            poses.push(RigidPose::new(
                Vec3::new(i as f32, rng.gen_range(-0.1..0.1), rng.gen_range(-0.1..0.1)),
                Quat::from_rotation_y(rng.gen_range(-0.2..0.2)),
            ));
            velocities.push(MotionVelocity {
                linear_velocity: Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), 0.0),
                angular_velocity: Vec3::new(0.0, rng.gen_range(-1.0..1.0), 0.0),
                inverse_inertia: Vec3::ONE,
                inverse_mass: 1.0,
                gravity_factor: 1.0,
                ..MotionVelocity::ZERO
            });
        }
        poses.push(RigidPose::from_position(Vec3::new(-1.0, 0.0, 0.0)));
        let static_index = num_dynamic;

        let mut joints = Vec::new();
        for i in 0..num_dynamic {
            let j = rng.gen_range(0..num_dynamic);
            if i != j {
                let pair = BodyIndexPair::new(i, j);
                joints.push(Joint::ball_and_socket(pair, Vec3::new(0.5, 0.0, 0.0), Vec3::new(-0.5, 0.0, 0.0)).unwrap());
            }
            if i % 5 == 0 {
                let pair = BodyIndexPair::new(static_index, i);
                joints.push(Joint::ball_and_socket(pair, Vec3::ZERO, Vec3::new(-1.0, 0.0, 0.0)).unwrap());
            }
        }
        Scene {
            poses,
            velocities,
            joints,
        }
    }

    fn body_state(scene: &Scene, index: usize) -> JacobianBodyState {
        match scene.velocities.get(index) {
            Some(velocity) => JacobianBodyState {
                world_from_body: scene.poses[index],
                world_from_motion: scene.poses[index],
                velocity: *velocity,
            },
            None => JacobianBodyState::fixed(scene.poses[index]),
        }
    }

    fn build(scene: &Scene, phased: &PhasedDispatchPairs) -> Vec<Vec<Jacobian>> {
        phased
            .info
            .batches
            .iter()
            .map(|range| {
                let mut jacobians = Vec::new();
                for pair in &phased.pairs[range.clone()] {
                    let joint = &scene.joints[pair.joint_index().0];
                    JointJacobianBuilder::build_jacobians(
                        joint,
                        pair.joint_index(),
                        &body_state(scene, joint.body_pair.body_index_a),
                        &body_state(scene, joint.body_pair.body_index_b),
                        TIMESTEP,
                        ITERATIONS,
                        &mut jacobians,
                    );
                }
                jacobians
            })
            .collect()
    }

    fn run(seed: u64, num_dynamic: usize, thread_count: usize) -> Vec<MotionVelocity> {
        let mut scene = scene(seed, num_dynamic);
        let phased = DispatchPairSequencer::create_phased_dispatch_pairs(&[], &scene.joints, num_dynamic, None).unwrap();
        phased.info.check_integrity(&phased.pairs, num_dynamic).unwrap();
        let mut jacobians = build(&scene, &phased);
        let dispatcher = SimpleThreadDispatcher::new(thread_count);
        Solver::solve(
            &mut jacobians,
            &phased.info,
            &mut scene.velocities,
            TIMESTEP,
            ITERATIONS,
            Some(&dispatcher),
        );
        scene.velocities
    }

    #[test]
    fn thread_count_does_not_change_results() {
        for seed in 0..4 {
            let reference = run(seed, 64, 0);
            for thread_count in [1, 4] {
                let result = run(seed, 64, thread_count);
                assert_eq!(reference, result, "seed {seed}, {thread_count} threads");
            }
        }
    }

    #[test]
    fn last_iteration_flag() {
        let step = StepInput::new(0.5, 3, 1);
        assert!(!step.is_last_iteration());
        assert_eq!(step.inverse_timestep, 2.0);
        assert!(StepInput::new(0.5, 3, 2).is_last_iteration());
        assert!(StepInput::new(0.5, 0, 0).is_last_iteration());
    }

    #[test]
    fn anchored_body_is_pulled_back() {
        let mut scene = Scene {
            poses: vec![RigidPose::from_position(Vec3::new(0.0, -1.1, 0.0)), RigidPose::IDENTITY],
            velocities: vec![MotionVelocity {
                inverse_inertia: Vec3::ONE,
                inverse_mass: 1.0,
                ..MotionVelocity::ZERO
            }],
            joints: vec![Joint::ball_and_socket(BodyIndexPair::new(1, 0), Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)).unwrap()],
        };
        let phased = DispatchPairSequencer::create_phased_dispatch_pairs(&[], &scene.joints, 1, None).unwrap();
        let mut jacobians = build(&scene, &phased);
        Solver::solve(&mut jacobians, &phased.info, &mut scene.velocities, TIMESTEP, ITERATIONS, None);
        // The anchor sits 0.1 below the static body; the solver drives it back up.
        assert!(scene.velocities[0].linear_velocity.y > 0.0);
    }
}
