use glam::Vec3;

use crate::physics::constraints::constraint::ConstraintType;
use crate::physics::handles::{BodyIndexPair, JointIndex};

/// Two bodies touched during the step and at least one of them asked to hear about it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub body_pair: BodyIndexPair,
    /// Contact normal, pointing from body B to body A.
    pub normal: Vec3,
    pub contact_count: usize,
    /// Sum of the normal impulses applied over the step.
    pub accumulated_impulse: f32,
}

/// A trigger body overlapped another body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TriggerEvent {
    pub body_pair: BodyIndexPair,
}

/// A joint constraint applied more impulse than its `max_impulse` during the step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpulseEvent {
    pub joint_index: JointIndex,
    pub body_pair: BodyIndexPair,
    pub kind: ConstraintType,
    /// Impulse applied over the step, in joint frame A.
    pub impulse: Vec3,
}

/// Events raised by the final solver iteration, in phase and batch order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationEvents {
    pub collision_events: Vec<CollisionEvent>,
    pub trigger_events: Vec<TriggerEvent>,
    pub impulse_events: Vec<ImpulseEvent>,
}

impl SimulationEvents {
    pub fn is_empty(&self) -> bool {
        self.collision_events.is_empty() && self.trigger_events.is_empty() && self.impulse_events.is_empty()
    }

    pub fn clear(&mut self) {
        self.collision_events.clear();
        self.trigger_events.clear();
        self.impulse_events.clear();
    }

    /// Moves all events of `other` to the end of `self`.
    pub fn append(&mut self, other: &mut SimulationEvents) {
        self.collision_events.append(&mut other.collision_events);
        self.trigger_events.append(&mut other.trigger_events);
        self.impulse_events.append(&mut other.impulse_events);
    }
}
