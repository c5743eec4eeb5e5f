use super::node::{Node, NodeChild};
use super::tree::Tree;

/// Overlap callback for tree overlap queries.
pub trait OverlapHandler {
    /// Handles an overlap between leaves.
    fn handle(&mut self, index_a: usize, index_b: usize);
}

impl<F: FnMut(usize, usize)> OverlapHandler for F {
    #[inline(always)]
    fn handle(&mut self, index_a: usize, index_b: usize) {
        self(index_a, index_b)
    }
}

#[inline(always)]
pub(crate) fn leaf_index(child: &NodeChild) -> usize {
    Tree::encode(child.index) as usize
}

impl Tree {
    pub(crate) fn test_leaf_against_node<H: OverlapHandler>(
        &self,
        leaf_child: &NodeChild,
        node_index: i32,
        results: &mut H,
    ) {
        let node = &self.nodes[node_index as usize];
        for child in [&node.a, &node.b] {
            if leaf_child.intersects(child) {
                if child.is_leaf() {
                    results.handle(leaf_index(leaf_child), leaf_index(child));
                } else {
                    self.test_leaf_against_node(leaf_child, child.index, results);
                }
            }
        }
    }

    #[inline(always)]
    fn dispatch_test_for_nodes<H: OverlapHandler>(&self, a: &NodeChild, b: &NodeChild, results: &mut H) {
        match (a.is_leaf(), b.is_leaf()) {
            (false, false) => self.get_overlaps_between_different_nodes(
                &self.nodes[a.index as usize],
                &self.nodes[b.index as usize],
                results,
            ),
            // leaf B versus node A.
            (false, true) => self.test_node_against_leaf(a.index, b, results),
            // leaf A versus node B.
            (true, false) => self.test_leaf_against_node(a, b.index, results),
            // Two leaves.
            (true, true) => results.handle(leaf_index(a), leaf_index(b)),
        }
    }

    /// Like `test_leaf_against_node`, but reports the node's leaves first.
    fn test_node_against_leaf<H: OverlapHandler>(&self, node_index: i32, leaf_child: &NodeChild, results: &mut H) {
        let node = &self.nodes[node_index as usize];
        for child in [&node.a, &node.b] {
            if leaf_child.intersects(child) {
                if child.is_leaf() {
                    results.handle(leaf_index(child), leaf_index(leaf_child));
                } else {
                    self.test_node_against_leaf(child.index, leaf_child, results);
                }
            }
        }
    }

    pub(crate) fn get_overlaps_between_different_nodes<H: OverlapHandler>(&self, a: &Node, b: &Node, results: &mut H) {
        // There are no shared children, so test them all.
        if a.a.intersects(&b.a) {
            self.dispatch_test_for_nodes(&a.a, &b.a, results);
        }
        if a.a.intersects(&b.b) {
            self.dispatch_test_for_nodes(&a.a, &b.b, results);
        }
        if a.b.intersects(&b.a) {
            self.dispatch_test_for_nodes(&a.b, &b.a, results);
        }
        if a.b.intersects(&b.b) {
            self.dispatch_test_for_nodes(&a.b, &b.b, results);
        }
    }

    pub(crate) fn get_overlaps_in_node<H: OverlapHandler>(&self, node: &Node, results: &mut H) {
        if node.a.leaf_count > 0 && !node.a.is_leaf() {
            self.get_overlaps_in_node(&self.nodes[node.a.index as usize], results);
        }
        if node.b.leaf_count > 0 && !node.b.is_leaf() {
            self.get_overlaps_in_node(&self.nodes[node.b.index as usize], results);
        }
        if node.a.intersects(&node.b) {
            self.dispatch_test_for_nodes(&node.a, &node.b, results);
        }
    }

    /// Gets pairs of leaf indices with bounding boxes which overlap within this tree. Each unordered pair is
    /// reported once, in a fixed traversal order.
    pub fn get_self_overlaps<H: OverlapHandler>(&self, results: &mut H) {
        // If there are less than two leaves, there can't be any overlap.
        if self.leaf_count < 2 {
            return;
        }
        self.get_overlaps_in_node(&self.nodes[0], results);
    }
}

#[cfg(test)]
mod tests {
    use crate::utilities::bounding_box::BoundingBox;
    use glam::Vec3;

    use super::*;

    #[test]
    fn self_overlaps_match_brute_force() {
        let bounds: Vec<BoundingBox> = (0..60)
            .map(|i| {
                let t = i as f32;
                let center = Vec3::new((t * 1.7) % 9.0, (t * 0.37) % 4.0, (t * 2.3) % 5.0);
                BoundingBox::from_center_half_extents(center, Vec3::splat(0.4 + (i % 3) as f32 * 0.3))
            })
            .collect();
        let tree = Tree::binned_build(&bounds);
        let mut found = Vec::new();
        tree.get_self_overlaps(&mut |a: usize, b: usize| found.push((a.min(b), a.max(b))));
        found.sort_unstable();
        let mut expected = Vec::new();
        for a in 0..bounds.len() {
            for b in a + 1..bounds.len() {
                if BoundingBox::intersects(&bounds[a], &bounds[b]) {
                    expected.push((a, b));
                }
            }
        }
        assert_eq!(found, expected);
    }
}
