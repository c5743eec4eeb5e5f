use std::hash::Hash;

/// Ordered pair of body indices identifying a potential interaction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BodyIndexPair {
    pub body_index_a: usize,
    pub body_index_b: usize,
}

impl BodyIndexPair {
    #[inline(always)]
    pub fn new(body_index_a: usize, body_index_b: usize) -> Self {
        Self {
            body_index_a,
            body_index_b,
        }
    }

    #[inline(always)]
    pub fn swapped(self) -> Self {
        Self {
            body_index_a: self.body_index_b,
            body_index_b: self.body_index_a,
        }
    }

    /// Whether both indices name the same unordered pair as `other`.
    #[inline(always)]
    pub fn same_bodies(&self, other: &BodyIndexPair) -> bool {
        *self == *other || self.swapped() == *other
    }
}

// Newtype Pattern for enhanced type safety
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct JointIndex(pub usize);

impl std::fmt::Display for BodyIndexPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.body_index_a, self.body_index_b)
    }
}

impl std::fmt::Display for JointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "JointIndex<{}>", self.0)
    }
}
