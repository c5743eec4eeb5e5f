use glam::Vec3;

use crate::utilities::bounding_box::BoundingBox;

/// A child node in a tree structure, containing bounding box and metadata.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeChild {
    /// Minimum bounds of the bounding box
    pub min: Vec3,
    /// Index of the child node, or the encoded leaf index if negative
    pub index: i32,
    /// Maximum bounds of the bounding box
    pub max: Vec3,
    /// Number of leaves under this child; zero marks an unused slot
    pub leaf_count: i32,
}

impl NodeChild {
    /// Unused child slot. Its inverted bounds intersect nothing.
    pub const EMPTY: Self = Self {
        min: BoundingBox::EMPTY.min,
        index: -1,
        max: BoundingBox::EMPTY.max,
        leaf_count: 0,
    };

    #[inline(always)]
    pub fn new(bounds: BoundingBox, index: i32, leaf_count: i32) -> Self {
        Self {
            min: bounds.min,
            index,
            max: bounds.max,
            leaf_count,
        }
    }

    #[inline(always)]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.min, self.max)
    }

    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.index < 0
    }

    #[inline(always)]
    pub fn intersects(&self, other: &NodeChild) -> bool {
        self.leaf_count > 0
            && other.leaf_count > 0
            && !(self.max.cmplt(other.min) | other.max.cmplt(self.min)).any()
    }

    #[inline(always)]
    pub fn intersects_bounds(&self, bounds: &BoundingBox) -> bool {
        self.leaf_count > 0 && BoundingBox::intersects(&self.bounds(), bounds)
    }
}

/// 2-wide tree node.
///
/// The root bounding box is not stored in a node; queries test a node's children directly.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub a: NodeChild,
    pub b: NodeChild,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_sizes() {
        assert_eq!(mem::size_of::<NodeChild>(), 32);
        assert_eq!(mem::size_of::<Node>(), 64);
    }

    #[test]
    fn empty_child_intersects_nothing() {
        let everything = NodeChild::new(
            BoundingBox::new(Vec3::splat(-1e30), Vec3::splat(1e30)),
            0,
            4,
        );
        assert!(!NodeChild::EMPTY.intersects(&everything));
        assert!(!everything.intersects(&NodeChild::EMPTY));
        assert!(everything.intersects(&everything));
    }
}
