use tracing::{debug, debug_span};

use crate::physics::collision_detection::broad_phase::BroadPhase;
use crate::physics::collision_detection::narrow_phase::NarrowPhase;
use crate::physics::dispatch_pair_sequencer::DispatchPairSequencer;
use crate::physics::error::PhysicsResult;
use crate::physics::events::SimulationEvents;
use crate::physics::pose_integration::PoseIntegration;
use crate::physics::solver::Solver;
use crate::physics::step_config::StepConfig;
use crate::physics::world::PhysicsWorld;
use crate::utilities::job_handle::JobHandle;
use crate::utilities::thread_dispatcher::ThreadDispatcher;

/// World and result of a step scheduled with `Simulation::schedule_step`.
#[derive(Debug)]
pub struct StepOutput {
    pub world: PhysicsWorld,
    pub result: PhysicsResult<SimulationEvents>,
}

/// Runs the step pipeline: broad phase, pair scheduling, gravity, narrow phase, solver and integration.
pub struct Simulation;

impl Simulation {
    /// Advances `world` by `config.timestep`. Returns the events raised by the last solver iteration.
    ///
    /// The configuration is validated before anything is touched; an invalid configuration leaves the world
    /// unchanged. Results do not depend on `multi_threaded` or the thread count.
    pub fn step(world: &mut PhysicsWorld, config: &StepConfig) -> PhysicsResult<SimulationEvents> {
        config.validate()?;
        let _step = debug_span!(
            "step",
            bodies = world.num_bodies(),
            dynamic_bodies = world.num_dynamic_bodies(),
            joints = world.num_joints()
        )
        .entered();
        let dispatcher = config.dispatcher();
        let dispatcher = dispatcher.as_ref().map(|dispatcher| dispatcher as &dyn ThreadDispatcher);
        let timestep = config.timestep;

        let body_pairs = {
            let _span = debug_span!("broad_phase").entered();
            let handle = BroadPhase::schedule_build_jobs(
                world,
                timestep,
                config.gravity,
                config.collision_tolerance,
                config.build_static_tree,
                config.multi_threaded,
            );
            handle.complete(world.broad_phase_mut());
            world.broad_phase().find_overlaps()
        };

        let phased = {
            let _span = debug_span!("schedule").entered();
            let phased = DispatchPairSequencer::create_phased_dispatch_pairs(
                &body_pairs,
                world.joints(),
                world.num_dynamic_bodies(),
                dispatcher,
            )?;
            debug_assert_eq!(phased.info.check_integrity(&phased.pairs, world.num_dynamic_bodies()), Ok(()));
            phased
        };

        {
            let (motion_datas, motion_velocities) = world.motions_mut();
            PoseIntegration::apply_gravity_and_damping(motion_datas, motion_velocities, config.gravity, timestep);
        }

        let mut jacobians = {
            let _span = debug_span!("narrow_phase").entered();
            NarrowPhase::create_jacobians(world, &phased, config, dispatcher)
        };

        let events = {
            let _span = debug_span!("solve").entered();
            Solver::solve(
                &mut jacobians,
                &phased.info,
                world.motion_velocities_mut(),
                timestep,
                config.solver_iteration_count,
                dispatcher,
            )
        };

        let (motion_datas, motion_velocities) = world.motions_mut();
        PoseIntegration::integrate(motion_datas, motion_velocities, timestep);
        world.sync_body_poses();

        debug!(
            body_pairs = body_pairs.len(),
            dispatch_pairs = phased.pairs.len(),
            active_phases = phased.info.num_active_phases,
            collision_events = events.collision_events.len(),
            trigger_events = events.trigger_events.len(),
            impulse_events = events.impulse_events.len(),
            "step complete"
        );
        Ok(events)
    }

    /// Moves `world` onto a worker and steps it there. The world comes back through the handle.
    pub fn schedule_step(world: PhysicsWorld, config: StepConfig) -> JobHandle<StepOutput> {
        JobHandle::schedule(config.multi_threaded, move || {
            let mut world = world;
            let result = Self::step(&mut world, &config);
            StepOutput { world, result }
        })
    }
}
