use glam::Vec3;
use tracing::trace;

use crate::physics::body_properties::{MotionVelocity, RigidBody};
use crate::physics::collidables::material::CollisionFilter;
use crate::physics::handles::BodyIndexPair;
use crate::physics::trees::Tree;
use crate::physics::world::PhysicsWorld;
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::job_handle::JobHandle;

/// One of the two broad phase trees plus the filters of its leaves. Leaf `i` is body `first_body_index + i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadPhaseTree {
    pub tree: Tree,
    pub filters: Vec<CollisionFilter>,
    pub first_body_index: usize,
}

impl BroadPhaseTree {
    /// Builds a tree over `bounds`; one filter per leaf.
    pub fn build(bounds: &[BoundingBox], filters: Vec<CollisionFilter>, first_body_index: usize) -> Self {
        debug_assert_eq!(bounds.len(), filters.len());
        Self {
            tree: Tree::binned_build(bounds),
            filters,
            first_body_index,
        }
    }

    #[inline(always)]
    pub fn leaf_count(&self) -> usize {
        self.filters.len()
    }
}

/// Bounds and filters gathered from the world, ready to be built into a tree on any thread.
struct TreeInput {
    bounds: Vec<BoundingBox>,
    filters: Vec<CollisionFilter>,
    first_body_index: usize,
}

impl TreeInput {
    fn build(self) -> BroadPhaseTree {
        BroadPhaseTree::build(&self.bounds, self.filters, self.first_body_index)
    }
}

/// Completion handle of the broad phase tree builds started by `BroadPhase::schedule_build_jobs`.
#[must_use = "the broad phase keeps its old trees until the build handle is completed"]
pub struct BroadPhaseBuildHandle {
    static_tree: Option<JobHandle<BroadPhaseTree>>,
    dynamic_tree: JobHandle<BroadPhaseTree>,
}

impl BroadPhaseBuildHandle {
    pub fn is_completed(&self) -> bool {
        self.dynamic_tree.is_completed() && self.static_tree.as_ref().map_or(true, |job| job.is_completed())
    }

    /// Waits for every build and installs the trees in `broad_phase`.
    pub fn complete(self, broad_phase: &mut BroadPhase) {
        if let Some(static_tree) = self.static_tree {
            broad_phase.static_tree = static_tree.complete();
        }
        broad_phase.dynamic_tree = self.dynamic_tree.complete();
    }
}

/// Finds the pairs of bodies whose bounds overlap.
///
/// Static and dynamic bodies are kept in separate trees, both rebuilt from scratch. Dynamic bounds are grown by
/// the motion predicted over the step so contacts can be created before the bodies touch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BroadPhase {
    static_tree: BroadPhaseTree,
    dynamic_tree: BroadPhaseTree,
}

impl BroadPhase {
    #[inline(always)]
    pub fn static_tree(&self) -> &BroadPhaseTree {
        &self.static_tree
    }

    #[inline(always)]
    pub fn dynamic_tree(&self) -> &BroadPhaseTree {
        &self.dynamic_tree
    }

    /// Bounds of a static body: its collider bounds grown by half the collision tolerance.
    pub fn static_body_bounds(body: &RigidBody, collision_tolerance: f32) -> BoundingBox {
        match &body.collider {
            Some(collider) => collider.calculate_aabb(&body.world_from_body).expanded(collision_tolerance * 0.5),
            None => BoundingBox::new(body.world_from_body.position, body.world_from_body.position),
        }
    }

    /// Bounds of a dynamic body over the coming step. The linear displacement, including the drop due to
    /// gravity, only grows the side the body moves toward; the rotation grows every side.
    pub fn dynamic_body_bounds(
        body: &RigidBody,
        velocity: &MotionVelocity,
        collision_tolerance: f32,
        timestep: f32,
        gravity: Vec3,
    ) -> BoundingBox {
        let bounds = Self::static_body_bounds(body, collision_tolerance);
        if body.collider.is_none() {
            return bounds;
        }
        let expansion = velocity.calculate_expansion(timestep);
        let displacement = expansion.linear + gravity * (velocity.gravity_factor * timestep * timestep);
        bounds.swept(displacement).expanded(expansion.uniform)
    }

    /// Bodies without a collider get a filter that matches nothing, so they never pair.
    fn filter_of(body: &RigidBody) -> CollisionFilter {
        body.collider.as_ref().map_or(CollisionFilter::ZERO, |collider| *collider.filter())
    }

    fn static_input(static_bodies: &[RigidBody], first_body_index: usize, collision_tolerance: f32) -> TreeInput {
        TreeInput {
            bounds: static_bodies
                .iter()
                .map(|body| Self::static_body_bounds(body, collision_tolerance))
                .collect(),
            filters: static_bodies.iter().map(Self::filter_of).collect(),
            first_body_index,
        }
    }

    fn dynamic_input(
        dynamic_bodies: &[RigidBody],
        motion_velocities: &[MotionVelocity],
        collision_tolerance: f32,
        timestep: f32,
        gravity: Vec3,
    ) -> TreeInput {
        assert_eq!(
            dynamic_bodies.len(),
            motion_velocities.len(),
            "every dynamic body needs a motion velocity"
        );
        TreeInput {
            bounds: dynamic_bodies
                .iter()
                .zip(motion_velocities)
                .map(|(body, velocity)| {
                    Self::dynamic_body_bounds(body, velocity, collision_tolerance, timestep, gravity)
                })
                .collect(),
            filters: dynamic_bodies.iter().map(Self::filter_of).collect(),
            first_body_index: 0,
        }
    }

    /// Rebuilds both trees on the calling thread. Dynamic bodies are indexed from zero, static bodies follow them.
    pub fn build(
        &mut self,
        static_bodies: &[RigidBody],
        dynamic_bodies: &[RigidBody],
        motion_velocities: &[MotionVelocity],
        collision_tolerance: f32,
        timestep: f32,
        gravity: Vec3,
    ) {
        self.static_tree = Self::static_input(static_bodies, dynamic_bodies.len(), collision_tolerance).build();
        self.dynamic_tree =
            Self::dynamic_input(dynamic_bodies, motion_velocities, collision_tolerance, timestep, gravity).build();
        trace!(
            static_leaves = self.static_tree.leaf_count(),
            dynamic_leaves = self.dynamic_tree.leaf_count(),
            "built broad phase"
        );
    }

    /// Starts the tree builds for `world`. Bounds are gathered on the calling thread; with `multi_threaded` each
    /// tree is then built on its own worker, otherwise both are built before returning and the handle is already
    /// complete.
    ///
    /// The static tree is rebuilt only when `build_static_tree` is set or the static body count changed since it
    /// was last built.
    pub fn schedule_build_jobs(
        world: &PhysicsWorld,
        timestep: f32,
        gravity: Vec3,
        collision_tolerance: f32,
        build_static_tree: bool,
        multi_threaded: bool,
    ) -> BroadPhaseBuildHandle {
        let static_bodies = world.static_bodies();
        let current = world.broad_phase().static_tree();
        let static_is_stale =
            current.leaf_count() != static_bodies.len() || current.first_body_index != world.num_dynamic_bodies();
        let static_tree = (build_static_tree || static_is_stale).then(|| {
            let input = Self::static_input(static_bodies, world.num_dynamic_bodies(), collision_tolerance);
            JobHandle::schedule(multi_threaded, move || input.build())
        });
        let input = Self::dynamic_input(
            world.dynamic_bodies(),
            world.motion_velocities(),
            collision_tolerance,
            timestep,
            gravity,
        );
        let dynamic_tree = JobHandle::schedule(multi_threaded, move || input.build());
        BroadPhaseBuildHandle {
            static_tree,
            dynamic_tree,
        }
    }

    /// Every dynamic-dynamic and dynamic-static pair with overlapping bounds whose filters allow a collision,
    /// ordered by body indices.
    pub fn find_overlaps(&self) -> Vec<BodyIndexPair> {
        let mut pairs = Vec::new();
        let dynamic = &self.dynamic_tree;
        let statics = &self.static_tree;
        dynamic.tree.get_self_overlaps(&mut |a: usize, b: usize| {
            if CollisionFilter::is_collision_enabled(&dynamic.filters[a], &dynamic.filters[b]) {
                pairs.push(BodyIndexPair::new(a.min(b), a.max(b)));
            }
        });
        dynamic.tree.get_overlaps_with_tree(&statics.tree, &mut |a: usize, s: usize| {
            if CollisionFilter::is_collision_enabled(&dynamic.filters[a], &statics.filters[s]) {
                pairs.push(BodyIndexPair::new(a, statics.first_body_index + s));
            }
        });
        pairs.sort_unstable();
        trace!(pairs = pairs.len(), "found broad phase overlaps");
        pairs
    }
}
