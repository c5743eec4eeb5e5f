pub mod box_pair_tester;
pub mod capsule_pair_tester;
pub mod convex_collision_task;
pub mod convex_pair_tester;
pub mod manifold_candidate_helper;
pub mod sphere_capsule_tester;
pub mod sphere_pair_tester;

pub use convex_collision_task::ConvexCollisionTask;
pub use convex_pair_tester::ConvexPairTester;
