pub mod body_properties;
pub mod collidables;
pub mod collision_detection;
pub mod constraints;
pub mod dispatch_pair;
pub mod dispatch_pair_sequencer;
pub mod error;
pub mod events;
pub mod handles;
pub mod pose_integration;
pub mod simplex_solver;
pub mod simulation;
pub mod solver;
pub mod solver_scheduler_info;
pub mod step_config;
pub mod trees;
pub mod world;

pub use body_properties::{MotionData, MotionVelocity, RigidBody, RigidPose};
pub use error::{PhysicsError, PhysicsResult};
pub use events::SimulationEvents;
pub use simulation::{Simulation, StepOutput};
pub use step_config::StepConfig;
pub use world::PhysicsWorld;
