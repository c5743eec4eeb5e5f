pub mod contact_jacobian;

pub use contact_jacobian::{ContactJacobian, ContactSettings, TriggerJacobian};
