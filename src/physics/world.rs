use crate::physics::body_properties::{MotionData, MotionVelocity, RigidBody};
use crate::physics::collision_detection::broad_phase::BroadPhase;
use crate::physics::constraints::joint::Joint;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::handles::BodyIndexPair;

/// Bodies, motions and joints of a simulation, plus the broad phase built over them.
///
/// Bodies are stored dynamic first: indices `0..num_dynamic_bodies` are dynamic and own the motion data and
/// velocity at the same index, the rest are static. Static body `i` therefore has body index
/// `num_dynamic_bodies + i`.
#[derive(Debug, Clone, Default)]
pub struct PhysicsWorld {
    bodies: Vec<RigidBody>,
    motion_datas: Vec<MotionData>,
    motion_velocities: Vec<MotionVelocity>,
    joints: Vec<Joint>,
    num_dynamic_bodies: usize,
    broad_phase: BroadPhase,
}

/// Joint occupying a slot that was never set. It has no constraints and connects body 0 to itself.
fn unset_joint() -> Joint {
    Joint::with_body_pair(BodyIndexPair::new(0, 0))
}

impl PhysicsWorld {
    /// Creates a world with default bodies and joints. Default bodies have no collider and dynamic ones start
    /// with infinite mass.
    pub fn new(num_static_bodies: usize, num_dynamic_bodies: usize, num_joints: usize) -> Self {
        let mut world = Self::default();
        world.reset(num_static_bodies, num_dynamic_bodies, num_joints);
        world
    }

    /// Returns the world to the state `new` would create with these counts, reusing its storage.
    pub fn reset(&mut self, num_static_bodies: usize, num_dynamic_bodies: usize, num_joints: usize) {
        self.bodies.clear();
        self.bodies.resize(num_static_bodies + num_dynamic_bodies, RigidBody::default());
        self.motion_datas.clear();
        self.motion_datas.resize(num_dynamic_bodies, MotionData::default());
        self.motion_velocities.clear();
        self.motion_velocities.resize(num_dynamic_bodies, MotionVelocity::ZERO);
        self.joints.clear();
        self.joints.resize_with(num_joints, unset_joint);
        self.num_dynamic_bodies = num_dynamic_bodies;
        self.broad_phase = BroadPhase::default();
    }

    /// Releases the world's collider references.
    pub fn dispose(self) {
        for body in self.bodies {
            if let Some(collider) = body.collider {
                collider.dispose();
            }
        }
    }

    #[inline(always)]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    #[inline(always)]
    pub fn num_dynamic_bodies(&self) -> usize {
        self.num_dynamic_bodies
    }

    #[inline(always)]
    pub fn num_static_bodies(&self) -> usize {
        self.bodies.len() - self.num_dynamic_bodies
    }

    #[inline(always)]
    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    #[inline(always)]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    #[inline(always)]
    pub fn dynamic_bodies(&self) -> &[RigidBody] {
        &self.bodies[..self.num_dynamic_bodies]
    }

    #[inline(always)]
    pub fn static_bodies(&self) -> &[RigidBody] {
        &self.bodies[self.num_dynamic_bodies..]
    }

    #[inline(always)]
    pub fn motion_datas(&self) -> &[MotionData] {
        &self.motion_datas
    }

    #[inline(always)]
    pub fn motion_datas_mut(&mut self) -> &mut [MotionData] {
        &mut self.motion_datas
    }

    #[inline(always)]
    pub fn motion_velocities(&self) -> &[MotionVelocity] {
        &self.motion_velocities
    }

    #[inline(always)]
    pub fn motion_velocities_mut(&mut self) -> &mut [MotionVelocity] {
        &mut self.motion_velocities
    }

    /// Motion data and velocities together, for stages that read one while writing the other.
    #[inline(always)]
    pub fn motions_mut(&mut self) -> (&mut [MotionData], &mut [MotionVelocity]) {
        (&mut self.motion_datas, &mut self.motion_velocities)
    }

    #[inline(always)]
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    #[inline(always)]
    pub fn broad_phase(&self) -> &BroadPhase {
        &self.broad_phase
    }

    #[inline(always)]
    pub fn broad_phase_mut(&mut self) -> &mut BroadPhase {
        &mut self.broad_phase
    }

    /// Body index of static body `static_index`.
    #[inline(always)]
    pub fn static_body_index(&self, static_index: usize) -> usize {
        self.num_dynamic_bodies + static_index
    }

    pub fn set_dynamic_body(
        &mut self,
        index: usize,
        body: RigidBody,
        motion_data: MotionData,
        motion_velocity: MotionVelocity,
    ) -> PhysicsResult<()> {
        if index >= self.num_dynamic_bodies {
            return Err(PhysicsError::BodyIndexOutOfRange {
                index,
                count: self.num_dynamic_bodies,
            });
        }
        self.bodies[index] = body;
        self.motion_datas[index] = motion_data;
        self.motion_velocities[index] = motion_velocity;
        Ok(())
    }

    /// Sets static body `static_index`, stored at body index `num_dynamic_bodies + static_index`.
    pub fn set_static_body(&mut self, static_index: usize, body: RigidBody) -> PhysicsResult<()> {
        let count = self.num_static_bodies();
        if static_index >= count {
            return Err(PhysicsError::BodyIndexOutOfRange {
                index: static_index,
                count,
            });
        }
        let index = self.static_body_index(static_index);
        self.bodies[index] = body;
        Ok(())
    }

    pub fn set_motion_velocity(&mut self, index: usize, motion_velocity: MotionVelocity) -> PhysicsResult<()> {
        let count = self.num_dynamic_bodies;
        let slot = self
            .motion_velocities
            .get_mut(index)
            .ok_or(PhysicsError::BodyIndexOutOfRange { index, count })?;
        *slot = motion_velocity;
        Ok(())
    }

    pub fn set_joint(&mut self, index: usize, joint: Joint) -> PhysicsResult<()> {
        if index >= self.joints.len() {
            return Err(PhysicsError::JointIndexOutOfRange {
                index,
                count: self.joints.len(),
            });
        }
        if joint.body_pair.body_index_a == joint.body_pair.body_index_b {
            return Err(PhysicsError::InvalidJoint {
                reason: "a joint must connect two different bodies",
            });
        }
        for body_index in [joint.body_pair.body_index_a, joint.body_pair.body_index_b] {
            if body_index >= self.bodies.len() {
                return Err(PhysicsError::BodyIndexOutOfRange {
                    index: body_index,
                    count: self.bodies.len(),
                });
            }
        }
        self.joints[index] = joint;
        Ok(())
    }

    /// Moves every dynamic body to the pose of its motion frame.
    pub fn sync_body_poses(&mut self) {
        for (body, motion_data) in self.bodies.iter_mut().zip(&self.motion_datas) {
            body.world_from_body = motion_data.world_from_body();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::physics::body_properties::RigidPose;
    use crate::physics::collidables::collider::{Collider, ColliderBlob};
    use crate::physics::collidables::material::{CollisionFilter, Material};
    use crate::physics::collidables::sphere::Sphere;
    use crate::physics::constraints::constraint::Constraint;

    fn ball() -> ColliderBlob {
        Collider::create_sphere(Sphere::new(Vec3::ZERO, 0.5), CollisionFilter::DEFAULT, Material::default()).unwrap()
    }

    #[test]
    fn counters_follow_the_layout() {
        let world = PhysicsWorld::new(3, 2, 1);
        assert_eq!(world.num_bodies(), 5);
        assert_eq!(world.num_static_bodies(), 3);
        assert_eq!(world.num_dynamic_bodies(), 2);
        assert_eq!(world.num_joints(), 1);
        assert_eq!(world.dynamic_bodies().len(), 2);
        assert_eq!(world.static_bodies().len(), 3);
        assert_eq!(world.motion_velocities().len(), 2);
        assert_eq!(world.static_body_index(1), 3);
    }

    #[test]
    fn setters_reject_bad_indices() {
        let mut world = PhysicsWorld::new(1, 1, 1);
        assert_eq!(
            world.set_dynamic_body(1, RigidBody::default(), MotionData::default(), MotionVelocity::ZERO),
            Err(PhysicsError::BodyIndexOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(
            world.set_static_body(1, RigidBody::default()),
            Err(PhysicsError::BodyIndexOutOfRange { index: 1, count: 1 })
        );
        assert_eq!(
            world.set_motion_velocity(2, MotionVelocity::ZERO),
            Err(PhysicsError::BodyIndexOutOfRange { index: 2, count: 1 })
        );
        let joint = Joint::with_body_pair(BodyIndexPair::new(0, 2));
        assert_eq!(
            world.set_joint(0, joint.clone()),
            Err(PhysicsError::BodyIndexOutOfRange { index: 2, count: 2 })
        );
        assert_eq!(
            world.set_joint(1, joint),
            Err(PhysicsError::JointIndexOutOfRange { index: 1, count: 1 })
        );
    }

    #[test]
    fn self_joints_are_rejected() {
        let mut world = PhysicsWorld::new(0, 2, 1);
        let mut joint = Joint::with_body_pair(BodyIndexPair::new(1, 1));
        assert!(matches!(
            joint.set_constraints(&[Constraint::ball_and_socket()]),
            Err(PhysicsError::InvalidJoint { .. })
        ));
        assert!(matches!(world.set_joint(0, joint), Err(PhysicsError::InvalidJoint { .. })));
        assert_eq!(world.joints()[0].body_pair, BodyIndexPair::new(0, 0));
    }

    #[test]
    fn static_bodies_follow_dynamic_ones() {
        let mut world = PhysicsWorld::new(1, 1, 0);
        let pose = RigidPose::from_position(Vec3::new(0.0, -1.0, 0.0));
        world.set_static_body(0, RigidBody::new(Some(ball()), pose)).unwrap();
        assert!(world.bodies()[0].collider.is_none());
        assert_eq!(world.bodies()[1].world_from_body, pose);
    }

    #[test]
    fn clone_is_independent() {
        let mut world = PhysicsWorld::new(0, 1, 0);
        let mut copy = world.clone();
        let velocity = MotionVelocity {
            linear_velocity: Vec3::X,
            ..MotionVelocity::ZERO
        };
        copy.set_motion_velocity(0, velocity).unwrap();
        assert_eq!(world.motion_velocities()[0], MotionVelocity::ZERO);
        world.reset(2, 0, 0);
        assert_eq!(copy.num_dynamic_bodies(), 1);
        assert_eq!(copy.motion_velocities()[0], velocity);
    }

    #[test]
    fn dispose_releases_colliders() {
        let collider = ball();
        let mut world = PhysicsWorld::new(0, 1, 0);
        world
            .set_dynamic_body(
                0,
                RigidBody::new(Some(collider.clone()), RigidPose::IDENTITY),
                MotionData::default(),
                MotionVelocity::ZERO,
            )
            .unwrap();
        let copy = world.clone();
        assert!(!collider.is_unique());
        world.dispose();
        copy.dispose();
        assert!(collider.is_unique());
    }

    #[test]
    fn reset_restores_defaults() {
        let mut world = PhysicsWorld::new(1, 1, 1);
        world.set_static_body(0, RigidBody::new(Some(ball()), RigidPose::IDENTITY)).unwrap();
        world.reset(1, 1, 1);
        assert!(world.bodies().iter().all(|body| body.collider.is_none()));
        assert!(world.joints()[0].constraints().is_empty());
    }

    #[test]
    fn sync_moves_dynamic_bodies_to_their_motion() {
        let mut world = PhysicsWorld::new(1, 1, 0);
        let moved = RigidPose::from_position(Vec3::new(1.0, 2.0, 3.0));
        world.motion_datas_mut()[0].world_from_motion = moved;
        world.sync_body_poses();
        assert_eq!(world.bodies()[0].world_from_body, moved);
        assert_eq!(world.bodies()[1].world_from_body, RigidPose::IDENTITY);
    }
}
