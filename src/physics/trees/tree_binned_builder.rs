use glam::Vec3;

use crate::utilities::bounding_box::BoundingBox;

use super::node::{Node, NodeChild};
use super::tree::Tree;

/// Maximum number of bins used to evaluate split candidates along the chosen axis.
pub const MAXIMUM_BIN_COUNT: usize = 16;
/// Below this centroid span along the widest axis, the leaves are split at the median instead of binned.
const DEGENERATE_SPAN: f32 = 1e-7;
/// Beyond this depth every split is a median split, bounding the recursion.
const MAXIMUM_SAH_DEPTH: usize = 48;

struct BuildContext<'a> {
    bounds: &'a [BoundingBox],
    centroids: Vec<Vec3>,
    nodes: Vec<Node>,
    scratch: Vec<i32>,
}

#[inline(always)]
fn compute_bin_index(centroid_min: f32, offset_to_bin_index: f32, bin_count: usize, centroid: f32) -> usize {
    let index = ((centroid - centroid_min) * offset_to_bin_index) as usize;
    index.min(bin_count - 1)
}

impl BuildContext<'_> {
    fn allocate_node(&mut self) -> usize {
        self.nodes.push(Node {
            a: NodeChild::EMPTY,
            b: NodeChild::EMPTY,
        });
        self.nodes.len() - 1
    }

    /// Picks the split position within `leaves`, reordering them so that `leaves[..split]` goes to child a.
    fn partition(&mut self, leaves: &mut [i32], depth: usize) -> usize {
        let count = leaves.len();
        let centroid_bounds = leaves.iter().fold(BoundingBox::EMPTY, |mut b, &leaf| {
            b.include_point(self.centroids[leaf as usize]);
            b
        });
        let span = centroid_bounds.extents();
        let axis = if span.x >= span.y && span.x >= span.z {
            0
        } else if span.y >= span.z {
            1
        } else {
            2
        };
        let axis_span = span[axis];
        if axis_span <= DEGENERATE_SPAN || depth > MAXIMUM_SAH_DEPTH {
            // Coincident centroids carry no spatial information; keep the input order and halve.
            return count / 2;
        }

        let bin_count = MAXIMUM_BIN_COUNT.min(count);
        let offset_to_bin_index = bin_count as f32 / axis_span;
        let centroid_min = centroid_bounds.min[axis];
        let mut bin_bounds = [BoundingBox::EMPTY; MAXIMUM_BIN_COUNT];
        let mut bin_counts = [0usize; MAXIMUM_BIN_COUNT];
        for &leaf in leaves.iter() {
            let bin = compute_bin_index(
                centroid_min,
                offset_to_bin_index,
                bin_count,
                self.centroids[leaf as usize][axis],
            );
            bin_bounds[bin] = BoundingBox::create_merged(&bin_bounds[bin], &self.bounds[leaf as usize]);
            bin_counts[bin] += 1;
        }

        // Sweep from the right to accumulate suffix costs, then from the left to pick the cheapest split.
        let mut suffix_metric = [0.0f32; MAXIMUM_BIN_COUNT];
        let mut suffix_count = [0usize; MAXIMUM_BIN_COUNT];
        let mut accumulated = BoundingBox::EMPTY;
        let mut accumulated_count = 0;
        for bin in (1..bin_count).rev() {
            accumulated = BoundingBox::create_merged(&accumulated, &bin_bounds[bin]);
            accumulated_count += bin_counts[bin];
            suffix_metric[bin] = accumulated.compute_bounds_metric();
            suffix_count[bin] = accumulated_count;
        }
        let mut best_split_bin = 1;
        let mut best_cost = f32::MAX;
        let mut prefix = BoundingBox::EMPTY;
        let mut prefix_count = 0;
        for split_bin in 1..bin_count {
            prefix = BoundingBox::create_merged(&prefix, &bin_bounds[split_bin - 1]);
            prefix_count += bin_counts[split_bin - 1];
            if prefix_count == 0 || suffix_count[split_bin] == 0 {
                continue;
            }
            let cost = prefix.compute_bounds_metric() * prefix_count as f32
                + suffix_metric[split_bin] * suffix_count[split_bin] as f32;
            if cost < best_cost {
                best_cost = cost;
                best_split_bin = split_bin;
            }
        }

        // Stable partition so identical inputs always produce identical trees.
        self.scratch.clear();
        let mut write = 0;
        for i in 0..count {
            let leaf = leaves[i];
            // write never passes i, so the slot read here has not been overwritten yet.
            let bin = compute_bin_index(
                centroid_min,
                offset_to_bin_index,
                bin_count,
                self.centroids[leaf as usize][axis],
            );
            if bin < best_split_bin {
                leaves[write] = leaf;
                write += 1;
            } else {
                self.scratch.push(leaf);
            }
        }
        leaves[write..].copy_from_slice(&self.scratch);
        if write == 0 || write == count {
            count / 2
        } else {
            write
        }
    }

    fn build_child(&mut self, leaves: &mut [i32], depth: usize) -> NodeChild {
        if leaves.len() == 1 {
            let leaf = leaves[0];
            return NodeChild::new(self.bounds[leaf as usize], Tree::encode(leaf), 1);
        }
        let node_index = self.allocate_node();
        let node = self.build_node(leaves, depth);
        self.nodes[node_index] = node;
        NodeChild::new(
            BoundingBox::create_merged(&node.a.bounds(), &node.b.bounds()),
            node_index as i32,
            leaves.len() as i32,
        )
    }

    fn build_node(&mut self, leaves: &mut [i32], depth: usize) -> Node {
        let split = self.partition(leaves, depth);
        let (left, right) = leaves.split_at_mut(split);
        let a = self.build_child(left, depth + 1);
        let b = self.build_child(right, depth + 1);
        Node { a, b }
    }
}

impl Tree {
    /// Builds a tree over the given leaf bounds using a binned surface area heuristic. Leaf `i` of the tree
    /// refers to `leaf_bounds[i]`.
    pub fn binned_build(leaf_bounds: &[BoundingBox]) -> Tree {
        let leaf_count = leaf_bounds.len();
        match leaf_count {
            0 => return Tree::empty(),
            1 => {
                return Tree {
                    nodes: vec![Node {
                        a: NodeChild::new(leaf_bounds[0], Tree::encode(0), 1),
                        b: NodeChild::EMPTY,
                    }],
                    leaf_count,
                }
            }
            _ => {}
        }

        let mut context = BuildContext {
            bounds: leaf_bounds,
            centroids: leaf_bounds.iter().map(|b| b.center()).collect(),
            nodes: Vec::with_capacity(leaf_count - 1),
            scratch: Vec::with_capacity(leaf_count),
        };
        let mut leaves: Vec<i32> = (0..leaf_count as i32).collect();
        let root_index = context.allocate_node();
        let root = context.build_node(&mut leaves, 0);
        context.nodes[root_index] = root;
        debug_assert_eq!(context.nodes.len(), leaf_count - 1);
        Tree {
            nodes: context.nodes,
            leaf_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_valid_tree_for_scattered_boxes() {
        let bounds: Vec<BoundingBox> = (0..100)
            .map(|i| {
                let center = Vec3::new((i % 10) as f32 * 3.0, (i / 10) as f32 * 2.0, (i % 7) as f32);
                BoundingBox::from_center_half_extents(center, Vec3::splat(0.5))
            })
            .collect();
        let tree = Tree::binned_build(&bounds);
        assert_eq!(tree.leaf_count, 100);
        assert_eq!(tree.node_count(), 99);
        assert!(tree.validate());
    }

    #[test]
    fn degenerate_boxes_fall_back_to_median_split() {
        let bounds = vec![BoundingBox::from_center_half_extents(Vec3::ONE, Vec3::ZERO); 1000];
        let tree = Tree::binned_build(&bounds);
        assert!(tree.validate());
        assert!(tree.compute_max_depth() <= 11);
    }

    #[test]
    fn tiny_trees() {
        assert!(Tree::binned_build(&[]).validate());
        let single = Tree::binned_build(&[BoundingBox::new(Vec3::ZERO, Vec3::ONE)]);
        assert!(single.validate());
        assert_eq!(single.root_bounds(), BoundingBox::new(Vec3::ZERO, Vec3::ONE));
    }
}
