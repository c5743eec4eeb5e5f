use tracing::trace;

use crate::physics::body_properties::{MotionExpansion, RigidPose};
use crate::physics::collidables::collider::{Collider, ColliderShape};
use crate::physics::collidables::material::{CollisionFilter, CollisionResponsePolicy, Material};
use crate::physics::collision_detection::collision_tasks::convex_collision_task::ConvexCollisionTask;
use crate::physics::collision_detection::collision_tasks::convex_pair_tester::ConvexPairTester;
use crate::physics::collision_detection::contact_manifold::ContactManifold;
use crate::physics::constraints::contact::{ContactJacobian, ContactSettings, TriggerJacobian};
use crate::physics::constraints::jacobian::{
    Jacobian, JacobianBodies, JacobianBodyState, JacobianData, JacobianFlags, JacobianHeader, JacobianType,
};
use crate::physics::constraints::joint_jacobian_builder::JointJacobianBuilder;
use crate::physics::dispatch_pair::DispatchPair;
use crate::physics::dispatch_pair_sequencer::PhasedDispatchPairs;
use crate::physics::handles::BodyIndexPair;
use crate::physics::step_config::StepConfig;
use crate::physics::world::PhysicsWorld;
use crate::utilities::memory::DisjointBuffer;
use crate::utilities::thread_dispatcher::{for_each_job, ThreadDispatcher};

/// Contact manifold between two leaf colliders of a body pair, in world space.
struct LeafManifold<'a> {
    collider_a: &'a Collider,
    collider_b: &'a Collider,
    manifold: ContactManifold,
}

/// Turns the scheduled dispatch pairs of a step into jacobians.
///
/// The output holds one jacobian list per scheduled batch, so `jacobians[i]` covers the pairs of
/// `info.batches[i]` in dispatch order. Batches are independent and are built in parallel when a dispatcher
/// is supplied.
pub struct NarrowPhase;

impl NarrowPhase {
    pub fn create_jacobians(
        world: &PhysicsWorld,
        phased: &PhasedDispatchPairs,
        config: &StepConfig,
        dispatcher: Option<&dyn ThreadDispatcher>,
    ) -> Vec<Vec<Jacobian>> {
        let batches = &phased.info.batches;
        let mut jacobians: Vec<Vec<Jacobian>> = vec![Vec::new(); batches.len()];
        {
            let output = DisjointBuffer::new(&mut jacobians);
            for_each_job(dispatcher, batches.len(), &|batch_index| {
                // SAFETY: every batch index is handed out once.
                let batch_output = unsafe { output.get_mut(batch_index) };
                for pair in &phased.pairs[batches[batch_index].clone()] {
                    Self::process_pair(world, *pair, config, batch_output);
                }
            });
        }
        trace!(
            batches = jacobians.len(),
            jacobians = jacobians.iter().map(Vec::len).sum::<usize>(),
            "built jacobians"
        );
        jacobians
    }

    fn body_state(world: &PhysicsWorld, body_index: usize) -> JacobianBodyState {
        let body = &world.bodies()[body_index];
        if body_index < world.num_dynamic_bodies() {
            JacobianBodyState {
                world_from_body: body.world_from_body,
                world_from_motion: world.motion_datas()[body_index].world_from_motion,
                velocity: world.motion_velocities()[body_index],
            }
        } else {
            JacobianBodyState::fixed(body.world_from_body)
        }
    }

    fn expansion(world: &PhysicsWorld, body_index: usize, timestep: f32) -> MotionExpansion {
        if body_index < world.num_dynamic_bodies() {
            world.motion_velocities()[body_index].calculate_expansion(timestep)
        } else {
            MotionExpansion {
                linear: glam::Vec3::ZERO,
                uniform: 0.0,
            }
        }
    }

    /// Distance under which separated contacts are still reported: the relative motion of the two bodies over
    /// the step plus the collision tolerance.
    fn contact_margin(world: &PhysicsWorld, pair: BodyIndexPair, config: &StepConfig) -> f32 {
        let a = Self::expansion(world, pair.body_index_a, config.timestep);
        let b = Self::expansion(world, pair.body_index_b, config.timestep);
        (a.linear - b.linear).length() + a.uniform + b.uniform + config.collision_tolerance
    }

    fn process_pair(world: &PhysicsWorld, pair: DispatchPair, config: &StepConfig, output: &mut Vec<Jacobian>) {
        let body_pair = pair.body_pair();
        let state_a = Self::body_state(world, body_pair.body_index_a);
        let state_b = Self::body_state(world, body_pair.body_index_b);

        if pair.is_joint() {
            let joint_index = pair.joint_index();
            let joint = &world.joints()[joint_index.0];
            // The dispatch pair may have swapped the joint's bodies; build in the joint's own order.
            let (joint_a, joint_b) = if joint.body_pair == body_pair {
                (state_a, state_b)
            } else {
                (state_b, state_a)
            };
            JointJacobianBuilder::build_jacobians(
                joint,
                joint_index,
                &joint_a,
                &joint_b,
                config.timestep,
                config.solver_iteration_count,
                output,
            );
            return;
        }

        let bodies = world.bodies();
        let (Some(collider_a), Some(collider_b)) = (
            bodies[body_pair.body_index_a].collider.as_deref(),
            bodies[body_pair.body_index_b].collider.as_deref(),
        ) else {
            return;
        };
        let margin = Self::contact_margin(world, body_pair, config);
        let settings = ContactSettings {
            timestep: config.timestep,
            contact_tau: config.contact_tau,
            max_depenetration_velocity: config.max_depenetration_velocity,
        };
        let jacobian_bodies = JacobianBodies::new(&state_a, &state_b);

        let mut emit = |leaf: LeafManifold| {
            let material_a = leaf.collider_a.material();
            let material_b = leaf.collider_b.material();
            let policy = CollisionResponsePolicy::resolve(material_a.collision_response, material_b.collision_response);
            let (kind, flags, data) = match policy {
                CollisionResponsePolicy::None => return,
                CollisionResponsePolicy::RaiseTriggerEvents => (
                    JacobianType::Trigger,
                    JacobianFlags::NONE,
                    JacobianData::Trigger(TriggerJacobian::build(
                        &leaf.manifold,
                        &jacobian_bodies,
                        &state_a.velocity,
                        &state_b.velocity,
                    )),
                ),
                CollisionResponsePolicy::Collide | CollisionResponsePolicy::CollideRaiseCollisionEvents => {
                    let flags = if policy == CollisionResponsePolicy::CollideRaiseCollisionEvents {
                        JacobianFlags::ENABLE_COLLISION_EVENTS
                    } else {
                        JacobianFlags::NONE
                    };
                    (
                        JacobianType::Contact,
                        flags,
                        JacobianData::Contact(ContactJacobian::build(
                            &leaf.manifold,
                            &jacobian_bodies,
                            &state_a.velocity,
                            &state_b.velocity,
                            Material::get_combined_friction(material_a, material_b),
                            Material::get_combined_restitution(material_a, material_b),
                            &settings,
                        )),
                    )
                }
            };
            output.push(Jacobian {
                header: JacobianHeader {
                    body_pair,
                    kind,
                    flags,
                    joint_index: None,
                },
                data,
            });
        };
        Self::collide(
            collider_a,
            &state_a.world_from_body,
            collider_b,
            &state_b.world_from_body,
            margin,
            &mut emit,
        );
    }

    /// Collides two colliders, descending into compounds and meshes, and hands every non empty leaf manifold to
    /// `emit`. Manifold normals point from `b` to `a`.
    fn collide<'a>(
        a: &'a Collider,
        pose_a: &RigidPose,
        b: &'a Collider,
        pose_b: &RigidPose,
        margin: f32,
        emit: &mut dyn FnMut(LeafManifold<'a>),
    ) {
        match (a.shape(), b.shape()) {
            (ColliderShape::Compound(compound), _) => {
                let query = b.calculate_aabb(&(pose_a.inverse() * *pose_b)).expanded(margin);
                compound.for_each_overlapping_child(&query, |_, child| {
                    if CollisionFilter::is_collision_enabled(child.collider.filter(), b.filter()) {
                        let child_pose = *pose_a * child.compound_from_child;
                        Self::collide(&child.collider, &child_pose, b, pose_b, margin, emit);
                    }
                });
            }
            (_, ColliderShape::Compound(compound)) => {
                let query = a.calculate_aabb(&(pose_b.inverse() * *pose_a)).expanded(margin);
                compound.for_each_overlapping_child(&query, |_, child| {
                    if CollisionFilter::is_collision_enabled(a.filter(), child.collider.filter()) {
                        let child_pose = *pose_b * child.compound_from_child;
                        Self::collide(a, pose_a, &child.collider, &child_pose, margin, emit);
                    }
                });
            }
            (ColliderShape::Mesh(_), ColliderShape::Mesh(_)) => {}
            (ColliderShape::Mesh(mesh), _) => {
                let Some(convex_b) = b.as_convex() else {
                    return;
                };
                let query = b.calculate_aabb(&(pose_a.inverse() * *pose_b)).expanded(margin);
                mesh.for_each_overlapping_triangle(&query, |_, triangle| {
                    if let Some(manifold) = ConvexPairTester::test(&triangle, pose_a, convex_b, pose_b, margin) {
                        emit(LeafManifold {
                            collider_a: a,
                            collider_b: b,
                            manifold,
                        });
                    }
                });
            }
            (_, ColliderShape::Mesh(mesh)) => {
                let Some(convex_a) = a.as_convex() else {
                    return;
                };
                let query = a.calculate_aabb(&(pose_b.inverse() * *pose_a)).expanded(margin);
                mesh.for_each_overlapping_triangle(&query, |_, triangle| {
                    if let Some(manifold) = ConvexPairTester::test(convex_a, pose_a, &triangle, pose_b, margin) {
                        emit(LeafManifold {
                            collider_a: a,
                            collider_b: b,
                            manifold,
                        });
                    }
                });
            }
            _ => {
                if let Some(manifold) = ConvexCollisionTask::collide(a, pose_a, b, pose_b, margin) {
                    emit(LeafManifold {
                        collider_a: a,
                        collider_b: b,
                        manifold,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::physics::body_properties::{MotionData, MotionVelocity, RigidBody};
    use crate::physics::collidables::box_shape::BoxShape;
    use crate::physics::collidables::collider::ColliderBlob;
    use crate::physics::collidables::compound::CompoundChild;
    use crate::physics::collidables::sphere::Sphere;
    use crate::physics::constraints::joint::Joint;
    use crate::physics::dispatch_pair_sequencer::DispatchPairSequencer;
    use crate::utilities::thread_dispatcher::SimpleThreadDispatcher;

    fn sphere(radius: f32, material: Material) -> ColliderBlob {
        Collider::create_sphere(Sphere::new(Vec3::ZERO, radius), CollisionFilter::DEFAULT, material).unwrap()
    }

    fn ground() -> ColliderBlob {
        Collider::create_box(
            BoxShape::from_half_extents(Vec3::new(10.0, 0.5, 10.0)),
            CollisionFilter::DEFAULT,
            Material::default(),
        )
        .unwrap()
    }

    /// One dynamic ball per entry, all above a static ground box at index `balls.len()`.
    fn world_with_balls(balls: &[(ColliderBlob, Vec3)]) -> PhysicsWorld {
        world_with_balls_and_joints(balls, 0)
    }

    fn world_with_balls_and_joints(balls: &[(ColliderBlob, Vec3)], num_joints: usize) -> PhysicsWorld {
        let mut world = PhysicsWorld::new(1, balls.len(), num_joints);
        for (index, (collider, position)) in balls.iter().enumerate() {
            let pose = RigidPose::from_position(*position);
            let mass = collider.mass_properties();
            world
                .set_dynamic_body(
                    index,
                    RigidBody::new(Some(collider.clone()), pose),
                    MotionData::from_body(pose, mass),
                    MotionVelocity::from_mass(mass, 1.0),
                )
                .unwrap();
        }
        world
            .set_static_body(0, RigidBody::new(Some(ground()), RigidPose::from_position(Vec3::new(0.0, -0.5, 0.0))))
            .unwrap();
        world
    }

    fn build(world: &PhysicsWorld, pairs: &[BodyIndexPair], threads: usize) -> Vec<Vec<Jacobian>> {
        let phased =
            DispatchPairSequencer::create_phased_dispatch_pairs(pairs, world.joints(), world.num_dynamic_bodies(), None)
                .unwrap();
        let dispatcher = SimpleThreadDispatcher::new(threads);
        NarrowPhase::create_jacobians(world, &phased, &StepConfig::default(), Some(&dispatcher))
    }

    #[test]
    fn resting_sphere_builds_one_contact() {
        let world = world_with_balls(&[(sphere(0.5, Material::default()), Vec3::new(0.0, 0.49, 0.0))]);
        let jacobians = build(&world, &[BodyIndexPair::new(0, 1)], 0);
        assert_eq!(jacobians.len(), 1);
        assert_eq!(jacobians[0].len(), 1);
        let jacobian = &jacobians[0][0];
        assert_eq!(jacobian.header.kind, JacobianType::Contact);
        assert_eq!(jacobian.header.flags, JacobianFlags::NONE);
        let JacobianData::Contact(contact) = &jacobian.data else {
            panic!("expected a contact jacobian");
        };
        assert!(contact.normal.abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(contact.points.len(), 1);
        assert!((contact.points[0].distance + 0.01).abs() < 1e-5);
    }

    #[test]
    fn distant_sphere_builds_nothing() {
        let world = world_with_balls(&[(sphere(0.5, Material::default()), Vec3::new(0.0, 5.0, 0.0))]);
        let jacobians = build(&world, &[BodyIndexPair::new(0, 1)], 0);
        assert!(jacobians[0].is_empty());
    }

    #[test]
    fn response_policy_selects_the_jacobian() {
        let trigger = Material {
            collision_response: CollisionResponsePolicy::RaiseTriggerEvents,
            ..Material::default()
        };
        let ignored = Material {
            collision_response: CollisionResponsePolicy::None,
            ..Material::default()
        };
        let evented = Material {
            collision_response: CollisionResponsePolicy::CollideRaiseCollisionEvents,
            ..Material::default()
        };
        let world = world_with_balls(&[
            (sphere(0.5, trigger), Vec3::new(-5.0, 0.4, 0.0)),
            (sphere(0.5, ignored), Vec3::new(0.0, 0.4, 0.0)),
            (sphere(0.5, evented), Vec3::new(5.0, 0.4, 0.0)),
        ]);
        let pairs = [BodyIndexPair::new(0, 3), BodyIndexPair::new(1, 3), BodyIndexPair::new(2, 3)];
        let jacobians: Vec<Jacobian> = build(&world, &pairs, 0).into_iter().flatten().collect();
        assert_eq!(jacobians.len(), 2);
        let trigger = jacobians.iter().find(|j| j.header.body_pair.body_index_a == 0).unwrap();
        assert_eq!(trigger.header.kind, JacobianType::Trigger);
        let evented = jacobians.iter().find(|j| j.header.body_pair.body_index_a == 2).unwrap();
        assert_eq!(evented.header.kind, JacobianType::Contact);
        assert!(evented.header.flags.contains(JacobianFlags::ENABLE_COLLISION_EVENTS));
    }

    #[test]
    fn compound_children_collide_separately() {
        let children = vec![
            CompoundChild {
                compound_from_child: RigidPose::from_position(Vec3::new(-1.0, 0.0, 0.0)),
                collider: sphere(0.5, Material::default()),
            },
            CompoundChild {
                compound_from_child: RigidPose::from_position(Vec3::new(1.0, 0.0, 0.0)),
                collider: sphere(0.5, Material::default()),
            },
            CompoundChild {
                compound_from_child: RigidPose::from_position(Vec3::new(0.0, 3.0, 0.0)),
                collider: sphere(0.5, Material::default()),
            },
        ];
        let dumbbell = Collider::create_compound(children).unwrap();
        let world = world_with_balls(&[(dumbbell, Vec3::new(0.0, 0.45, 0.0))]);
        let jacobians = build(&world, &[BodyIndexPair::new(0, 1)], 0);
        assert_eq!(jacobians[0].len(), 2);
        assert!(jacobians[0].iter().all(|j| j.header.kind == JacobianType::Contact));
    }

    #[test]
    fn sphere_on_mesh_ground() {
        let vertices = vec![
            Vec3::new(-5.0, 0.0, -5.0),
            Vec3::new(5.0, 0.0, -5.0),
            Vec3::new(5.0, 0.0, 5.0),
            Vec3::new(-5.0, 0.0, 5.0),
        ];
        let mesh = Collider::create_mesh(
            vertices,
            vec![[0, 2, 1], [0, 3, 2]],
            CollisionFilter::DEFAULT,
            Material::default(),
        )
        .unwrap();
        let mut world = PhysicsWorld::new(1, 1, 0);
        let ball = sphere(0.5, Material::default());
        let pose = RigidPose::from_position(Vec3::new(1.0, 0.48, 2.0));
        world
            .set_dynamic_body(
                0,
                RigidBody::new(Some(ball.clone()), pose),
                MotionData::from_body(pose, ball.mass_properties()),
                MotionVelocity::from_mass(ball.mass_properties(), 1.0),
            )
            .unwrap();
        world.set_static_body(0, RigidBody::new(Some(mesh), RigidPose::IDENTITY)).unwrap();
        let jacobians = build(&world, &[BodyIndexPair::new(0, 1)], 0);
        assert!(!jacobians[0].is_empty());
        for jacobian in &jacobians[0] {
            let JacobianData::Contact(contact) = &jacobian.data else {
                panic!("expected a contact jacobian");
            };
            assert!(contact.normal.abs_diff_eq(Vec3::Y, 1e-3));
            assert!(contact.points.iter().all(|point| (point.distance + 0.02).abs() < 1e-3));
        }
    }

    #[test]
    fn joint_pairs_build_joint_jacobians() {
        let mut world = world_with_balls_and_joints(
            &[
                (sphere(0.5, Material::default()), Vec3::new(0.0, 3.0, 0.0)),
                (sphere(0.5, Material::default()), Vec3::new(0.0, 5.0, 0.0)),
            ],
            1,
        );
        let joint = Joint::ball_and_socket(BodyIndexPair::new(1, 0), Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0))
            .unwrap();
        world.set_joint(0, joint).unwrap();
        let jacobians = build(&world, &[], 0);
        let jacobians: Vec<Jacobian> = jacobians.into_iter().flatten().collect();
        assert_eq!(jacobians.len(), 1);
        assert_eq!(jacobians[0].header.kind, JacobianType::LinearLimit);
        assert_eq!(jacobians[0].header.joint_index.map(|index| index.0), Some(0));
        assert_eq!(jacobians[0].initial_error(), Some(0.0));
    }

    #[test]
    fn threaded_build_matches_inline_build() {
        let balls: Vec<(ColliderBlob, Vec3)> = (0..40)
            .map(|i| (sphere(0.5, Material::default()), Vec3::new(i as f32 * 1.1 - 20.0, 0.45, 0.0)))
            .collect();
        let world = world_with_balls(&balls);
        let ground_index = balls.len();
        let mut pairs: Vec<BodyIndexPair> = (0..balls.len()).map(|i| BodyIndexPair::new(i, ground_index)).collect();
        pairs.extend((0..balls.len() - 1).map(|i| BodyIndexPair::new(i, i + 1)));
        assert_eq!(build(&world, &pairs, 0), build(&world, &pairs, 4));
    }
}
