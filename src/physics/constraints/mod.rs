pub mod angular_limit;
pub mod constraint;
pub mod contact;
pub mod inequality_helpers;
pub mod jacobian;
pub mod joint;
pub mod joint_jacobian_builder;
pub mod linear_limit;
pub mod motors;
pub mod spring_settings;

pub use constraint::{Constraint, ConstraintType};
pub use jacobian::{Jacobian, JacobianIterator, JacobianType};
pub use joint::{BodyFrame, Joint};
pub use spring_settings::{JacobianUtilities, SpringSettings};
