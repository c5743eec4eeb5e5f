use glam::{Mat3, Quat, Vec3};

use crate::physics::body_properties::RigidPose;

/// Center of mass and principal inertia of a shape, for unit mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassDistribution {
    /// Transform from the principal axes frame (the motion space) to the shape's local space.
    pub transform: RigidPose,
    /// Diagonal of the inertia tensor in the principal frame, for unit mass.
    pub inertia_tensor: Vec3,
}

impl Default for MassDistribution {
    fn default() -> Self {
        Self {
            transform: RigidPose::IDENTITY,
            inertia_tensor: Vec3::splat(2.0 / 5.0),
        }
    }
}

/// Mass related quantities of a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub mass_distribution: MassDistribution,
    pub volume: f32,
    /// Upper bound on how far any surface point can move per radian of rotation about the center of mass.
    pub angular_expansion_factor: f32,
}

impl Default for MassProperties {
    /// Properties of a unit sphere at the origin.
    fn default() -> Self {
        Self {
            mass_distribution: MassDistribution::default(),
            volume: 4.0 / 3.0 * std::f32::consts::PI,
            angular_expansion_factor: 0.0,
        }
    }
}

impl MassProperties {
    /// Solid box with the given half extents, centered on `center` and rotated by `orientation`.
    pub fn from_box(center: Vec3, orientation: Quat, half_extents: Vec3) -> Self {
        let sq = half_extents * half_extents;
        Self {
            mass_distribution: MassDistribution {
                transform: RigidPose::new(center, orientation),
                inertia_tensor: Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) / 3.0,
            },
            volume: 8.0 * half_extents.x * half_extents.y * half_extents.z,
            angular_expansion_factor: half_extents.length() - half_extents.min_element(),
        }
    }

    pub fn from_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            mass_distribution: MassDistribution {
                transform: RigidPose::from_position(center),
                inertia_tensor: Vec3::splat(0.4 * radius * radius),
            },
            volume: 4.0 / 3.0 * std::f32::consts::PI * radius * radius * radius,
            angular_expansion_factor: 0.0,
        }
    }

    /// Capsule spanning `vertex0..vertex1`; the principal frame's z axis runs along the segment.
    pub fn from_capsule(vertex0: Vec3, vertex1: Vec3, radius: f32) -> Self {
        use std::f32::consts::PI;
        let axis = vertex1 - vertex0;
        let height = axis.length();
        let r2 = radius * radius;
        let cylinder_volume = PI * r2 * height;
        let spheres_volume = 4.0 / 3.0 * PI * r2 * radius;
        let volume = cylinder_volume + spheres_volume;
        let (cylinder_share, spheres_share) = if volume > 0.0 {
            (cylinder_volume / volume, spheres_volume / volume)
        } else {
            (0.0, 1.0)
        };
        let axial = cylinder_share * r2 * 0.5 + spheres_share * 0.4 * r2;
        let lateral = cylinder_share * (r2 * 0.25 + height * height / 12.0)
            + spheres_share * (0.4 * r2 + height * height * 0.25 + 0.375 * height * radius);
        let orientation = if height > f32::EPSILON {
            Quat::from_rotation_arc(Vec3::Z, axis / height)
        } else {
            Quat::IDENTITY
        };
        Self {
            mass_distribution: MassDistribution {
                transform: RigidPose::new((vertex0 + vertex1) * 0.5, orientation),
                inertia_tensor: Vec3::new(lateral, lateral, axial),
            },
            volume,
            angular_expansion_factor: height * 0.5,
        }
    }

    /// Cylinder whose axis is the local y axis of `orientation`.
    pub fn from_cylinder(center: Vec3, orientation: Quat, radius: f32, half_length: f32) -> Self {
        let r2 = radius * radius;
        let lateral = (3.0 * r2 + 4.0 * half_length * half_length) / 12.0;
        Self {
            mass_distribution: MassDistribution {
                transform: RigidPose::new(center, orientation),
                inertia_tensor: Vec3::new(lateral, r2 * 0.5, lateral),
            },
            volume: std::f32::consts::PI * r2 * 2.0 * half_length,
            angular_expansion_factor: (r2 + half_length * half_length).sqrt() - radius.min(half_length),
        }
    }

    /// Combines children placed by `compound_from_child` into one distribution. Children are weighted by
    /// volume; the combined tensor keeps only the diagonal of the summed tensor.
    pub fn combine(children: &[(MassProperties, RigidPose)]) -> Self {
        let total_volume: f32 = children.iter().map(|(child, _)| child.volume).sum();
        let weight = |child: &MassProperties| {
            if total_volume > 0.0 {
                child.volume / total_volume
            } else {
                1.0 / children.len().max(1) as f32
            }
        };

        let mut center = Vec3::ZERO;
        for (child, compound_from_child) in children {
            let child_center = compound_from_child
                .transform_point(child.mass_distribution.transform.position);
            center += child_center * weight(child);
        }

        let mut tensor = Mat3::ZERO;
        let mut expansion = 0.0f32;
        for (child, compound_from_child) in children {
            let w = weight(child);
            let frame = *compound_from_child * child.mass_distribution.transform;
            let rotation = Mat3::from_quat(frame.orientation);
            let local = Mat3::from_diagonal(child.mass_distribution.inertia_tensor);
            tensor += (rotation * local * rotation.transpose()) * w;
            let offset = frame.position - center;
            let parallel_axis =
                Mat3::from_diagonal(Vec3::splat(offset.length_squared())) - outer_product(offset, offset);
            tensor += parallel_axis * w;
            expansion = expansion.max(child.angular_expansion_factor + offset.length());
        }

        Self {
            mass_distribution: MassDistribution {
                transform: RigidPose::from_position(center),
                inertia_tensor: Vec3::new(tensor.x_axis.x, tensor.y_axis.y, tensor.z_axis.z),
            },
            volume: total_volume,
            angular_expansion_factor: expansion,
        }
    }
}

#[inline(always)]
fn outer_product(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}
