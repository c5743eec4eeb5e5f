use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::trees::Tree;
use crate::utilities::bounding_box::BoundingBox;

use super::mass_properties::MassProperties;
use super::shape::bounds_of_points;
use super::triangle::Triangle;

/// Triangle soup with a bounding volume tree over its faces. Meshes collide against convex shapes one triangle
/// at a time and are meant for static geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    tree: Tree,
    local_bounds: BoundingBox,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> PhysicsResult<Self> {
        if triangles.is_empty() {
            return Err(PhysicsError::EmptyMesh);
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(PhysicsError::InvalidGeometry {
                reason: "mesh vertex is not finite",
            });
        }
        if triangles
            .iter()
            .flatten()
            .any(|&index| index as usize >= vertices.len())
        {
            return Err(PhysicsError::InvalidGeometry {
                reason: "mesh triangle references a missing vertex",
            });
        }
        let triangle_bounds: Vec<BoundingBox> = triangles
            .iter()
            .map(|t| BoundingBox::from_points(&t.map(|i| vertices[i as usize])))
            .collect();
        let tree = Tree::binned_build(&triangle_bounds);
        let local_bounds = tree.root_bounds();
        Ok(Self {
            vertices,
            triangles,
            tree,
            local_bounds,
        })
    }

    #[inline(always)]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline(always)]
    pub fn triangle(&self, index: usize) -> Triangle {
        let [a, b, c] = self.triangles[index];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// Invokes `enumerator` with every triangle whose bounds intersect `local_query`, given in mesh space.
    pub fn for_each_overlapping_triangle<F: FnMut(usize, Triangle)>(&self, local_query: &BoundingBox, mut enumerator: F) {
        self.tree.get_overlaps(local_query, |index| enumerator(index, self.triangle(index)));
    }

    pub fn compute_bounds(&self, pose: &RigidPose) -> BoundingBox {
        bounds_of_points(&self.vertices, pose)
    }

    #[inline(always)]
    pub fn local_bounds(&self) -> BoundingBox {
        self.local_bounds
    }

    /// Approximated by the mesh's local bounding box.
    pub fn compute_mass_properties(&self) -> MassProperties {
        MassProperties::from_box(
            self.local_bounds.center(),
            glam::Quat::IDENTITY,
            self.local_bounds.extents() * 0.5,
        )
    }
}
