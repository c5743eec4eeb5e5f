use crate::utilities::bounding_box::BoundingBox;

use super::node::{Node, NodeChild};

/// A binary bounding volume tree (BVH).
///
/// Leaves are identified by the index of the bounding box they were built from. The tree is rebuilt from
/// scratch rather than incrementally updated; the struct is defined here and extended with `impl Tree` blocks
/// in sibling modules.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
    /// Nodes of the tree. When the tree has leaves, node 0 is the root.
    pub nodes: Vec<Node>,
    /// Number of leaves in the tree.
    pub leaf_count: usize,
}

impl Tree {
    /// Encodes a leaf index into the negative-index form used by node children.
    #[inline(always)]
    pub fn encode(index: i32) -> i32 {
        -1 - index
    }

    /// Creates a tree with no leaves.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of every leaf in the tree.
    pub fn root_bounds(&self) -> BoundingBox {
        match self.nodes.first() {
            Some(root) => {
                let mut bounds = root.a.bounds();
                if root.b.leaf_count > 0 {
                    bounds = BoundingBox::create_merged(&bounds, &root.b.bounds());
                }
                bounds
            }
            None => BoundingBox::EMPTY,
        }
    }

    /// Depth of the deepest leaf; a single leaf under the root has depth 1.
    pub fn compute_max_depth(&self) -> usize {
        fn depth_of(tree: &Tree, child: &NodeChild) -> usize {
            if child.leaf_count == 0 {
                0
            } else if child.is_leaf() {
                1
            } else {
                let node = &tree.nodes[child.index as usize];
                1 + depth_of(tree, &node.a).max(depth_of(tree, &node.b))
            }
        }
        match self.nodes.first() {
            Some(root) => depth_of(self, &root.a).max(depth_of(self, &root.b)),
            None => 0,
        }
    }

    /// Checks that every child's bounds contain its subtree and that leaf counts add up.
    pub fn validate(&self) -> bool {
        fn check(tree: &Tree, child: &NodeChild, seen: &mut [bool]) -> bool {
            if child.leaf_count == 0 {
                return true;
            }
            if child.is_leaf() {
                let leaf = Tree::encode(child.index) as usize;
                if leaf >= seen.len() || seen[leaf] || child.leaf_count != 1 {
                    return false;
                }
                seen[leaf] = true;
                return true;
            }
            let node = &tree.nodes[child.index as usize];
            let bounds = child.bounds();
            let contains = |c: &NodeChild| c.leaf_count == 0 || bounds.contains(&c.bounds());
            node.a.leaf_count + node.b.leaf_count == child.leaf_count
                && contains(&node.a)
                && contains(&node.b)
                && check(tree, &node.a, seen)
                && check(tree, &node.b, seen)
        }
        let mut seen = vec![false; self.leaf_count];
        let ok = match self.nodes.first() {
            Some(root) => check(self, &root.a, &mut seen) && check(self, &root.b, &mut seen),
            None => self.leaf_count == 0,
        };
        ok && seen.iter().all(|&s| s)
    }
}
