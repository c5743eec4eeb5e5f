use thiserror::Error;

/// Contract violations reported by the world, collider and step entry points.
///
/// These are raised at the call that received the bad argument. Broken internal invariants (overlapping
/// phases, unknown jacobians) are not represented here; they abort the step instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("body index {index} out of range (count={count})")]
    BodyIndexOutOfRange { index: usize, count: usize },

    #[error("joint index {index} out of range (count={count})")]
    JointIndexOutOfRange { index: usize, count: usize },

    #[error("index {index} exceeds the {bits}-bit capacity of a dispatch pair")]
    DispatchPairIndexOverflow { index: usize, bits: u32 },

    #[error("invalid collider geometry: {reason}")]
    InvalidGeometry { reason: &'static str },

    #[error("convex hull requires at least one point")]
    EmptyPointSet,

    #[error("convex hull points span zero volume")]
    DegenerateConvexHull,

    #[error("compound collider requires at least one child")]
    EmptyCompound,

    #[error("compound nesting depth {depth} exceeds the limit of {limit}")]
    CompoundDepthExceeded { depth: usize, limit: usize },

    #[error("mesh collider requires at least one triangle")]
    EmptyMesh,

    #[error("joint has {count} constraints; at most {limit} are supported")]
    TooManyConstraints { count: usize, limit: usize },

    #[error("invalid joint: {reason}")]
    InvalidJoint { reason: &'static str },

    #[error("invalid step configuration: {reason}")]
    InvalidConfiguration { reason: &'static str },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
