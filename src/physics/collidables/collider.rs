use std::ops::Deref;
use std::sync::Arc;

use glam::Vec3;

use crate::physics::body_properties::RigidPose;
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::utilities::bounding_box::BoundingBox;

use super::box_shape::BoxShape;
use super::capsule::Capsule;
use super::compound::{Compound, CompoundChild};
use super::convex_hull::ConvexHull;
use super::cylinder::Cylinder;
use super::mass_properties::MassProperties;
use super::material::{CollisionFilter, Material};
use super::mesh::Mesh;
use super::shape::ConvexShape;
use super::sphere::Sphere;
use super::triangle::Triangle;

/// Discriminant of a collider's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderType {
    Sphere,
    Capsule,
    Box,
    Cylinder,
    ConvexHull,
    Triangle,
    Compound,
    Mesh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere(Sphere),
    Capsule(Capsule),
    Box(BoxShape),
    Cylinder(Cylinder),
    ConvexHull(ConvexHull),
    Triangle(Triangle),
    Compound(Compound),
    Mesh(Mesh),
}

/// Immutable collision geometry plus its surface and filtering data.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    shape: ColliderShape,
    material: Material,
    filter: CollisionFilter,
    mass_properties: MassProperties,
}

/// Reference counted handle to an immutable collider.
///
/// Cloning a blob shares the collider. `dispose` releases this reference; the collider is freed when the last
/// reference goes.
#[derive(Debug, Clone)]
pub struct ColliderBlob(Arc<Collider>);

impl Deref for ColliderBlob {
    type Target = Collider;

    #[inline(always)]
    fn deref(&self) -> &Collider {
        &self.0
    }
}

impl PartialEq for ColliderBlob {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || *self.0 == *other.0
    }
}

impl ColliderBlob {
    /// Whether this handle is the only reference to its collider.
    #[inline(always)]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.0) == 1
    }

    /// Whether two handles share one collider.
    #[inline(always)]
    pub fn ptr_eq(a: &ColliderBlob, b: &ColliderBlob) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Releases this reference.
    pub fn dispose(self) {
        drop(self)
    }
}

fn validate_material(material: &Material) -> PhysicsResult<()> {
    if material.is_valid() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidGeometry {
            reason: "material friction and restitution must be finite and non-negative",
        })
    }
}

impl Collider {
    fn into_blob(shape: ColliderShape, filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        validate_material(&material)?;
        let mass_properties = match &shape {
            ColliderShape::Sphere(s) => s.compute_mass_properties(),
            ColliderShape::Capsule(s) => s.compute_mass_properties(),
            ColliderShape::Box(s) => s.compute_mass_properties(),
            ColliderShape::Cylinder(s) => s.compute_mass_properties(),
            ColliderShape::ConvexHull(s) => s.compute_mass_properties(),
            ColliderShape::Triangle(s) => s.compute_mass_properties(),
            ColliderShape::Compound(s) => s.compute_mass_properties(),
            ColliderShape::Mesh(s) => s.compute_mass_properties(),
        };
        Ok(ColliderBlob(Arc::new(Collider {
            shape,
            material,
            filter,
            mass_properties,
        })))
    }

    pub fn create_sphere(sphere: Sphere, filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        if !sphere.is_valid() {
            return Err(PhysicsError::InvalidGeometry {
                reason: "sphere radius must be finite and non-negative",
            });
        }
        Self::into_blob(ColliderShape::Sphere(sphere), filter, material)
    }

    pub fn create_capsule(capsule: Capsule, filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        if !capsule.is_valid() {
            return Err(PhysicsError::InvalidGeometry {
                reason: "capsule vertices and radius must be finite with a non-negative radius",
            });
        }
        Self::into_blob(ColliderShape::Capsule(capsule), filter, material)
    }

    pub fn create_box(box_shape: BoxShape, filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        if !box_shape.is_valid() {
            return Err(PhysicsError::InvalidGeometry {
                reason: "box needs finite non-negative half extents and a unit orientation",
            });
        }
        Self::into_blob(ColliderShape::Box(box_shape), filter, material)
    }

    pub fn create_cylinder(cylinder: Cylinder, filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        if !cylinder.is_valid() {
            return Err(PhysicsError::InvalidGeometry {
                reason: "cylinder needs a finite non-negative radius and half length and a unit orientation",
            });
        }
        Self::into_blob(ColliderShape::Cylinder(cylinder), filter, material)
    }

    pub fn create_convex_hull(points: &[Vec3], filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        Self::into_blob(ColliderShape::ConvexHull(ConvexHull::new(points)?), filter, material)
    }

    pub fn create_triangle(triangle: Triangle, filter: CollisionFilter, material: Material) -> PhysicsResult<ColliderBlob> {
        if !(triangle.a.is_finite() && triangle.b.is_finite() && triangle.c.is_finite()) {
            return Err(PhysicsError::InvalidGeometry {
                reason: "triangle vertex is not finite",
            });
        }
        Self::into_blob(ColliderShape::Triangle(triangle), filter, material)
    }

    pub fn create_mesh(
        vertices: Vec<Vec3>,
        triangles: Vec<[u32; 3]>,
        filter: CollisionFilter,
        material: Material,
    ) -> PhysicsResult<ColliderBlob> {
        Self::into_blob(ColliderShape::Mesh(Mesh::new(vertices, triangles)?), filter, material)
    }

    /// Creates a compound. Its filter is the union of the children's filters; narrowphase uses each child's
    /// own material and filter.
    pub fn create_compound(children: Vec<CompoundChild>) -> PhysicsResult<ColliderBlob> {
        let compound = Compound::new(children)?;
        let filter = compound
            .children()
            .iter()
            .map(|child| *child.collider.filter())
            .reduce(|a, b| CollisionFilter::create_union(&a, &b))
            .unwrap_or(CollisionFilter::DEFAULT);
        let material = compound
            .children()
            .first()
            .map(|child| *child.collider.material())
            .unwrap_or_default();
        Self::into_blob(ColliderShape::Compound(compound), filter, material)
    }

    #[inline(always)]
    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    #[inline(always)]
    pub fn material(&self) -> &Material {
        &self.material
    }

    #[inline(always)]
    pub fn filter(&self) -> &CollisionFilter {
        &self.filter
    }

    /// Unit mass properties in the collider's local space.
    #[inline(always)]
    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    pub fn collider_type(&self) -> ColliderType {
        match self.shape {
            ColliderShape::Sphere(_) => ColliderType::Sphere,
            ColliderShape::Capsule(_) => ColliderType::Capsule,
            ColliderShape::Box(_) => ColliderType::Box,
            ColliderShape::Cylinder(_) => ColliderType::Cylinder,
            ColliderShape::ConvexHull(_) => ColliderType::ConvexHull,
            ColliderShape::Triangle(_) => ColliderType::Triangle,
            ColliderShape::Compound(_) => ColliderType::Compound,
            ColliderShape::Mesh(_) => ColliderType::Mesh,
        }
    }

    /// The shape as a convex core, or `None` for compounds and meshes.
    pub fn as_convex(&self) -> Option<&dyn ConvexShape> {
        match &self.shape {
            ColliderShape::Sphere(s) => Some(s),
            ColliderShape::Capsule(s) => Some(s),
            ColliderShape::Box(s) => Some(s),
            ColliderShape::Cylinder(s) => Some(s),
            ColliderShape::ConvexHull(s) => Some(s),
            ColliderShape::Triangle(s) => Some(s),
            ColliderShape::Compound(_) | ColliderShape::Mesh(_) => None,
        }
    }

    /// Compound nesting depth; zero for anything that is not a compound.
    pub fn compound_depth(&self) -> usize {
        match &self.shape {
            ColliderShape::Compound(compound) => compound.depth(),
            _ => 0,
        }
    }

    /// Bounds of the collider placed by `pose`.
    pub fn calculate_aabb(&self, pose: &RigidPose) -> BoundingBox {
        match &self.shape {
            ColliderShape::Compound(compound) => compound.compute_bounds(pose),
            ColliderShape::Mesh(mesh) => mesh.compute_bounds(pose),
            _ => match self.as_convex() {
                Some(convex) => convex.compute_bounds(pose),
                None => BoundingBox::EMPTY,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::physics::collidables::compound::MAX_COMPOUND_DEPTH;

    fn unit_sphere() -> ColliderBlob {
        Collider::create_sphere(Sphere::new(Vec3::ZERO, 1.0), CollisionFilter::DEFAULT, Material::default()).unwrap()
    }

    #[test]
    fn factories_validate_input() {
        assert!(Collider::create_sphere(
            Sphere::new(Vec3::ZERO, -1.0),
            CollisionFilter::DEFAULT,
            Material::default()
        )
        .is_err());
        assert!(Collider::create_box(
            BoxShape::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 2.0), Vec3::ONE),
            CollisionFilter::DEFAULT,
            Material::default()
        )
        .is_err());
        assert_eq!(
            Collider::create_convex_hull(&[], CollisionFilter::DEFAULT, Material::default()),
            Err(PhysicsError::EmptyPointSet)
        );
        assert_eq!(Collider::create_compound(vec![]), Err(PhysicsError::EmptyCompound));
    }

    #[test]
    fn compound_nesting_is_bounded() {
        let mut collider = unit_sphere();
        for _ in 0..MAX_COMPOUND_DEPTH {
            collider = Collider::create_compound(vec![CompoundChild {
                compound_from_child: RigidPose::IDENTITY,
                collider,
            }])
            .unwrap();
        }
        assert_eq!(collider.compound_depth(), MAX_COMPOUND_DEPTH);
        let too_deep = Collider::create_compound(vec![CompoundChild {
            compound_from_child: RigidPose::IDENTITY,
            collider,
        }]);
        assert_eq!(
            too_deep,
            Err(PhysicsError::CompoundDepthExceeded {
                depth: MAX_COMPOUND_DEPTH + 1,
                limit: MAX_COMPOUND_DEPTH
            })
        );
    }

    #[test]
    fn blobs_share_and_release() {
        let blob = unit_sphere();
        assert!(blob.is_unique());
        let shared = blob.clone();
        assert!(!blob.is_unique());
        assert!(ColliderBlob::ptr_eq(&blob, &shared));
        shared.dispose();
        assert!(blob.is_unique());
    }

    #[test]
    fn compound_bounds_cover_children() {
        let compound = Collider::create_compound(vec![
            CompoundChild {
                compound_from_child: RigidPose::from_position(Vec3::new(-2.0, 0.0, 0.0)),
                collider: unit_sphere(),
            },
            CompoundChild {
                compound_from_child: RigidPose::from_position(Vec3::new(2.0, 0.0, 0.0)),
                collider: unit_sphere(),
            },
        ])
        .unwrap();
        let bounds = compound.calculate_aabb(&RigidPose::from_position(Vec3::Y));
        assert!(bounds.min.abs_diff_eq(Vec3::new(-3.0, 0.0, -1.0), 1e-6));
        assert!(bounds.max.abs_diff_eq(Vec3::new(3.0, 2.0, 1.0), 1e-6));
        assert!(compound.as_convex().is_none());
    }
}
