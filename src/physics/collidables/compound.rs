use crate::physics::body_properties::RigidPose;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::trees::Tree;
use crate::utilities::bounding_box::BoundingBox;

use super::collider::ColliderBlob;
use super::mass_properties::MassProperties;

/// Deepest allowed nesting of compounds inside compounds.
pub const MAX_COMPOUND_DEPTH: usize = 8;

/// Child of a compound collider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundChild {
    pub compound_from_child: RigidPose,
    pub collider: ColliderBlob,
}

/// Collider made of other colliders, each placed in the compound's space.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    children: Vec<CompoundChild>,
    tree: Tree,
    local_bounds: BoundingBox,
    depth: usize,
}

impl Compound {
    pub fn new(children: Vec<CompoundChild>) -> PhysicsResult<Self> {
        if children.is_empty() {
            return Err(PhysicsError::EmptyCompound);
        }
        let depth = 1 + children
            .iter()
            .map(|child| child.collider.compound_depth())
            .max()
            .unwrap_or(0);
        if depth > MAX_COMPOUND_DEPTH {
            return Err(PhysicsError::CompoundDepthExceeded {
                depth,
                limit: MAX_COMPOUND_DEPTH,
            });
        }
        let child_bounds: Vec<BoundingBox> = children
            .iter()
            .map(|child| child.collider.calculate_aabb(&child.compound_from_child))
            .collect();
        let tree = Tree::binned_build(&child_bounds);
        let local_bounds = tree.root_bounds();
        Ok(Self {
            children,
            tree,
            local_bounds,
            depth,
        })
    }

    #[inline(always)]
    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }

    /// Nesting depth; a compound of primitives has depth 1.
    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline(always)]
    pub fn local_bounds(&self) -> BoundingBox {
        self.local_bounds
    }

    /// Invokes `enumerator` for every child whose bounds intersect `local_query`, given in compound space.
    pub fn for_each_overlapping_child<'a, F: FnMut(usize, &'a CompoundChild)>(
        &'a self,
        local_query: &BoundingBox,
        mut enumerator: F,
    ) {
        self.tree.get_overlaps(local_query, |index| enumerator(index, &self.children[index]));
    }

    pub fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        self.children
            .iter()
            .fold(BoundingBox::EMPTY, |bounds, child| {
                let child_bounds = child.collider.calculate_aabb(&(*pose * child.compound_from_child));
                BoundingBox::create_merged(&bounds, &child_bounds)
            })
    }

    pub fn compute_mass_properties(&self) -> MassProperties {
        let parts: Vec<(MassProperties, RigidPose)> = self
            .children
            .iter()
            .map(|child| (*child.collider.mass_properties(), child.compound_from_child))
            .collect();
        MassProperties::combine(&parts)
    }
}
