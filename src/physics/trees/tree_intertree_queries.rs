use super::node::NodeChild;
use super::tree::Tree;
use super::tree_self_queries::{leaf_index, OverlapHandler};

impl Tree {
    fn dispatch_test_for_nodes_intertree<H: OverlapHandler>(
        &self,
        a: &NodeChild,
        tree_b: &Tree,
        b: &NodeChild,
        results: &mut H,
    ) {
        match (a.is_leaf(), b.is_leaf()) {
            (true, true) => results.handle(leaf_index(a), leaf_index(b)),
            (true, false) => {
                let node_b = &tree_b.nodes[b.index as usize];
                for child_b in [&node_b.a, &node_b.b] {
                    if a.intersects(child_b) {
                        self.dispatch_test_for_nodes_intertree(a, tree_b, child_b, results);
                    }
                }
            }
            (false, _) => {
                let node_a = &self.nodes[a.index as usize];
                for child_a in [&node_a.a, &node_a.b] {
                    if child_a.intersects(b) {
                        self.dispatch_test_for_nodes_intertree(child_a, tree_b, b, results);
                    }
                }
            }
        }
    }

    /// Reports every pair of overlapping leaves between this tree and `tree_b` as (leaf in self, leaf in b).
    pub fn get_overlaps_with_tree<H: OverlapHandler>(&self, tree_b: &Tree, results: &mut H) {
        let (Some(root_a), Some(root_b)) = (self.nodes.first(), tree_b.nodes.first()) else {
            return;
        };
        for child_a in [&root_a.a, &root_a.b] {
            for child_b in [&root_b.a, &root_b.b] {
                if child_a.intersects(child_b) {
                    self.dispatch_test_for_nodes_intertree(child_a, tree_b, child_b, results);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::utilities::bounding_box::BoundingBox;
    use glam::Vec3;

    use super::*;

    fn grid(count: usize, offset: Vec3) -> Vec<BoundingBox> {
        (0..count)
            .map(|i| {
                let center = Vec3::new((i % 5) as f32, (i / 5) as f32, 0.0) * 1.5 + offset;
                BoundingBox::from_center_half_extents(center, Vec3::splat(0.5))
            })
            .collect()
    }

    #[test]
    fn intertree_overlaps_match_brute_force() {
        let a = grid(23, Vec3::ZERO);
        let b = grid(17, Vec3::new(0.7, 0.3, 0.2));
        let tree_a = Tree::binned_build(&a);
        let tree_b = Tree::binned_build(&b);
        let mut found = Vec::new();
        tree_a.get_overlaps_with_tree(&tree_b, &mut |i: usize, j: usize| found.push((i, j)));
        found.sort_unstable();
        let mut expected = Vec::new();
        for (i, box_a) in a.iter().enumerate() {
            for (j, box_b) in b.iter().enumerate() {
                if BoundingBox::intersects(box_a, box_b) {
                    expected.push((i, j));
                }
            }
        }
        assert_eq!(found, expected);
    }

    #[test]
    fn empty_tree_has_no_overlaps() {
        let tree = Tree::binned_build(&grid(4, Vec3::ZERO));
        let mut count = 0;
        tree.get_overlaps_with_tree(&Tree::empty(), &mut |_: usize, _: usize| count += 1);
        assert_eq!(count, 0);
    }
}
