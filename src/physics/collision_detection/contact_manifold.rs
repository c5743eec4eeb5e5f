use glam::Vec3;
use std::fmt;

use crate::physics::body_properties::RigidPose;

/// Information about a single contact in a convex manifold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContactPoint {
    /// World position of the contact on the surface of collidable B.
    pub position: Vec3,
    /// Penetration depth between the two collidables at this contact. Negative values represent separation.
    pub depth: f32,
}

/// Up to `MAX_CONTACTS` contacts sharing one normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactManifold {
    /// Surface basis of the manifold. Points from collidable B to collidable A.
    pub normal: Vec3,
    contacts: [ContactPoint; ContactManifold::MAX_CONTACTS],
    count: usize,
}

impl ContactManifold {
    pub const MAX_CONTACTS: usize = 4;

    pub fn new(normal: Vec3) -> Self {
        Self {
            normal,
            contacts: [ContactPoint::default(); Self::MAX_CONTACTS],
            count: 0,
        }
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline(always)]
    pub fn points(&self) -> &[ContactPoint] {
        &self.contacts[..self.count]
    }

    /// Adds a contact. Contacts beyond `MAX_CONTACTS` are dropped.
    #[inline(always)]
    pub fn push(&mut self, contact: ContactPoint) {
        if self.count < Self::MAX_CONTACTS {
            self.contacts[self.count] = contact;
            self.count += 1;
        }
    }

    /// Deepest contact depth, or `f32::NEG_INFINITY` when empty.
    pub fn max_depth(&self) -> f32 {
        self.points().iter().fold(f32::NEG_INFINITY, |depth, contact| depth.max(contact.depth))
    }

    /// Swaps the roles of A and B: flips the normal and moves each contact onto A's surface.
    pub fn flipped(&self) -> Self {
        let mut flipped = Self::new(-self.normal);
        for contact in self.points() {
            flipped.push(ContactPoint {
                position: contact.position - self.normal * contact.depth,
                depth: contact.depth,
            });
        }
        flipped
    }

    /// Moves the manifold by a rigid transform.
    pub fn transformed(&self, pose: &RigidPose) -> Self {
        let mut transformed = Self::new(pose.transform_direction(self.normal));
        for contact in self.points() {
            transformed.push(ContactPoint {
                position: pose.transform_point(contact.position),
                depth: contact.depth,
            });
        }
        transformed
    }

    /// Keeps at most four contacts out of `candidates`: the deepest, the one farthest from it, and the two that
    /// span the largest area with them on either side. Candidates deeper than `-max_separation` only.
    pub fn reduce(normal: Vec3, candidates: &[ContactPoint], max_separation: f32) -> Self {
        let mut manifold = Self::new(normal);
        let kept: Vec<ContactPoint> = candidates.iter().copied().filter(|c| c.depth >= -max_separation).collect();
        if kept.len() <= Self::MAX_CONTACTS {
            kept.iter().for_each(|&contact| manifold.push(contact));
            return manifold;
        }

        let deepest = (0..kept.len())
            .max_by(|&a, &b| kept[a].depth.total_cmp(&kept[b].depth).then(b.cmp(&a)))
            .unwrap_or(0);
        let start = kept[deepest].position;
        let farthest = (0..kept.len())
            .max_by(|&a, &b| {
                let da = kept[a].position.distance_squared(start);
                let db = kept[b].position.distance_squared(start);
                da.total_cmp(&db).then(b.cmp(&a))
            })
            .unwrap_or(0);
        let end = kept[farthest].position;
        let edge = end - start;
        let signed_area = |point: Vec3| edge.cross(point - start).dot(normal);
        let mut most_positive = None;
        let mut most_negative = None;
        for (index, contact) in kept.iter().enumerate() {
            if index == deepest || index == farthest {
                continue;
            }
            let area = signed_area(contact.position);
            if area > 0.0 && most_positive.map_or(true, |(_, best)| area > best) {
                most_positive = Some((index, area));
            }
            if area < 0.0 && most_negative.map_or(true, |(_, best)| area < best) {
                most_negative = Some((index, area));
            }
        }

        manifold.push(kept[deepest]);
        if farthest != deepest {
            manifold.push(kept[farthest]);
        }
        for (index, _) in [most_positive, most_negative].into_iter().flatten() {
            manifold.push(kept[index]);
        }
        manifold
    }
}

impl fmt::Display for ContactManifold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ContactManifold {{ normal: {}, count: {} }}", self.normal, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduction_keeps_the_outline() {
        let mut candidates = Vec::new();
        for x in 0..4 {
            for z in 0..4 {
                candidates.push(ContactPoint {
                    position: Vec3::new(x as f32, 0.0, z as f32),
                    depth: if x == 1 && z == 1 { 0.2 } else { 0.1 },
                });
            }
        }
        let manifold = ContactManifold::reduce(Vec3::Y, &candidates, 0.0);
        assert_eq!(manifold.count(), 4);
        assert_eq!(manifold.points()[0].position, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(manifold.points()[1].position, Vec3::new(3.0, 0.0, 3.0));
        assert!((manifold.max_depth() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn flipping_moves_contacts_to_the_other_surface() {
        let mut manifold = ContactManifold::new(Vec3::Y);
        manifold.push(ContactPoint {
            position: Vec3::ZERO,
            depth: 0.1,
        });
        let flipped = manifold.flipped();
        assert_eq!(flipped.normal, -Vec3::Y);
        assert!(flipped.points()[0].position.abs_diff_eq(Vec3::new(0.0, -0.1, 0.0), 1e-6));
    }
}
