pub mod broad_phase;
pub mod collision_tasks;
pub mod contact_manifold;
pub mod depth_refiner;
pub mod narrow_phase;
pub mod support_finder;

pub use broad_phase::{BroadPhase, BroadPhaseBuildHandle};
pub use contact_manifold::{ContactManifold, ContactPoint};
pub use narrow_phase::NarrowPhase;
