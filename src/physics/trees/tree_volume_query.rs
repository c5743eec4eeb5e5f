use crate::utilities::bounding_box::BoundingBox;

use super::tree::Tree;
use super::tree_self_queries::leaf_index;

impl Tree {
    /// Invokes `enumerator` for every leaf whose bounds intersect `bounds`, in depth first order.
    pub fn get_overlaps<F: FnMut(usize)>(&self, bounds: &BoundingBox, mut enumerator: F) {
        let Some(root) = self.nodes.first() else {
            return;
        };
        let mut stack = Vec::with_capacity(64);
        stack.push(root.b);
        stack.push(root.a);
        while let Some(child) = stack.pop() {
            if !child.intersects_bounds(bounds) {
                continue;
            }
            if child.is_leaf() {
                enumerator(leaf_index(&child));
            } else {
                let node = &self.nodes[child.index as usize];
                stack.push(node.b);
                stack.push(node.a);
            }
        }
    }
}
