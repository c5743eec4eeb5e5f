pub mod physics;
pub mod utilities;
