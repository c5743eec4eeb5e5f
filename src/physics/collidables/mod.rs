pub mod collider;
pub mod compound;
pub mod mass_properties;
pub mod material;
pub mod shape;

// Convex shape primitives
pub mod box_shape;
pub mod capsule;
pub mod convex_hull;
pub mod cylinder;
pub mod sphere;
pub mod triangle;

// Mesh
pub mod mesh;

pub use collider::{Collider, ColliderBlob, ColliderShape, ColliderType};
pub use material::{CollisionFilter, CollisionResponsePolicy, CombinePolicy, Material};
