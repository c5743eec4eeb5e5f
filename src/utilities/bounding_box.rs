use glam::Vec3;

/// Provides simple axis-aligned bounding box functionality.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Location with the lowest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub min: Vec3,
    /// Location with the highest X, Y, and Z coordinates in the axis-aligned bounding box.
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Inverted box which any merge will overwrite.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(-f32::MAX),
    };

    /// Constructs a bounding box from the specified minimum and maximum.
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates the tightest box containing a set of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |bounds, &p| Self {
            min: bounds.min.min(p),
            max: bounds.max.max(p),
        })
    }

    /// Creates a box centered on a point with the given half extents.
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Whether the box has been merged with anything since it was created empty.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Determines if a bounding box intersects another bounding box.
    #[inline]
    pub fn intersects(a: &Self, b: &Self) -> bool {
        let no_intersection_on_axes = a.max.cmplt(b.min) | b.max.cmplt(a.min);
        !no_intersection_on_axes.any()
    }

    /// Determines if this bounding box fully contains another.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Computes a bounding box which contains two other bounding boxes.
    #[inline]
    pub fn create_merged(a: &Self, b: &Self) -> Self {
        Self {
            min: a.min.min(b.min),
            max: a.max.max(b.max),
        }
    }

    /// Grows the box so it contains the given point.
    #[inline]
    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Returns a copy of the box grown by `margin` on every side.
    #[inline]
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Returns a copy of the box swept by a displacement. Only the side the box moves toward grows.
    #[inline]
    pub fn swept(&self, displacement: Vec3) -> Self {
        Self {
            min: self.min + displacement.min(Vec3::ZERO),
            max: self.max + displacement.max(Vec3::ZERO),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    /// Computes the volume of the bounding box.
    #[inline]
    pub fn compute_volume(&self) -> f32 {
        let diagonal = self.max - self.min;
        diagonal.x * diagonal.y * diagonal.z
    }

    /// Half of the surface area. Used as the cost metric by the tree builder; degenerate boxes give zero.
    #[inline]
    pub fn compute_bounds_metric(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let offset = self.max - self.min;
        offset.x * offset.y + offset.y * offset.z + offset.z * offset.x
    }

    /// Transforms a local box by a rotation and translation, returning the world box containing it.
    pub fn transformed(&self, orientation: glam::Quat, position: Vec3) -> Self {
        let rotation = glam::Mat3::from_quat(orientation);
        let center = rotation * self.center() + position;
        let half = self.extents() * 0.5;
        let abs_rotation = glam::Mat3::from_cols(
            rotation.x_axis.abs(),
            rotation.y_axis.abs(),
            rotation.z_axis.abs(),
        );
        Self::from_center_half_extents(center, abs_rotation * half)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn intersects_touching_boxes() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = BoundingBox::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(BoundingBox::intersects(&a, &b));
        assert!(!BoundingBox::intersects(&a, &c));
    }

    #[test]
    fn empty_box_merges_to_other() {
        let a = BoundingBox::new(Vec3::splat(-1.0), Vec3::ONE);
        let merged = BoundingBox::create_merged(&BoundingBox::EMPTY, &a);
        assert_eq!(merged, a);
        assert!(!BoundingBox::EMPTY.is_valid());
        assert_eq!(BoundingBox::EMPTY.compute_bounds_metric(), 0.0);
    }

    #[test]
    fn swept_box_grows_one_side() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let swept = a.swept(Vec3::new(2.0, -1.0, 0.0));
        assert_eq!(swept.min, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(swept.max, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn rotated_box_contains_corners() {
        let local = BoundingBox::new(Vec3::new(-1.0, -2.0, -0.5), Vec3::new(1.0, 2.0, 0.5));
        let orientation = Quat::from_rotation_z(0.7);
        let world = local.transformed(orientation, Vec3::new(3.0, 0.0, 0.0));
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { local.min.x } else { local.max.x },
                if i & 2 == 0 { local.min.y } else { local.max.y },
                if i & 4 == 0 { local.min.z } else { local.max.z },
            );
            let p = orientation * corner + Vec3::new(3.0, 0.0, 0.0);
            assert!(world.expanded(1e-5).contains(&BoundingBox::new(p, p)));
        }
    }
}
