use glam::Vec3;

/// Axis-aligned box enclosing all vertices of a scene.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// `None` for an empty point set.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |b, p| Self {
            min: b.min.min(p),
            max: b.max.max(p),
        }))
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Largest side length.
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// Radius of the sphere through the corners.
    pub fn bounding_radius(&self) -> f32 {
        self.half_extents().length()
    }

    pub fn floor_y(&self) -> f32 {
        self.min.y
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Grows the horizontal footprint by `fraction` of its size on each side,
    /// but never by less than `min_margin`.
    pub fn expanded_xz(&self, fraction: f32, min_margin: f32) -> BoundingBox {
        let size = self.size();
        let pad = Vec3::new(
            (size.x * fraction).max(min_margin),
            0.0,
            (size.z * fraction).max(min_margin),
        );
        BoundingBox::new(self.min - pad, self.max + pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::unit_cube;

    #[test]
    fn test_unit_cube_center_and_half_extents() {
        let bounds = BoundingBox::from_points(unit_cube(6).positions()).unwrap();
        assert_eq!(bounds.center(), Vec3::splat(0.5));
        assert_eq!(bounds.half_extents(), Vec3::splat(0.5));
        assert!((bounds.max_extent() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_points() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_single_point_box() {
        let p = Vec3::new(1.0, -2.0, 3.0);
        let bounds = BoundingBox::from_points([p]).unwrap();
        assert_eq!(bounds.center(), p);
        assert_eq!(bounds.max_extent(), 0.0);
        assert!(bounds.contains(p));
    }

    #[test]
    fn test_negative_coordinates() {
        let bounds = BoundingBox::from_points([
            Vec3::new(-4.0, 0.0, -1.0),
            Vec3::new(4.0, 3.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
        ])
        .unwrap();
        assert_eq!(bounds.center(), Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(bounds.half_extents(), Vec3::new(4.0, 1.5, 1.0));
        assert_eq!(bounds.floor_y(), 0.0);
        assert!((bounds.max_extent() - 8.0).abs() < 1e-6);
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        let b = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let u = a.union(&b);
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(3.0));
    }

    #[test]
    fn test_expanded_xz_leaves_height() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::new(10.0, 3.0, 4.0)).expanded_xz(0.1, 0.0);
        assert!(b.min.abs_diff_eq(Vec3::new(-1.0, 0.0, -0.4), 1e-5));
        assert!(b.max.abs_diff_eq(Vec3::new(11.0, 3.0, 4.4), 1e-5));
    }

    #[test]
    fn test_expanded_xz_flat_footprint_gets_min_margin() {
        let b = BoundingBox::new(Vec3::ZERO, Vec3::new(10.0, 3.0, 0.0)).expanded_xz(0.1, 1.0);
        assert!(b.min.abs_diff_eq(Vec3::new(-1.0, 0.0, -1.0), 1e-5));
        assert!(b.max.abs_diff_eq(Vec3::new(11.0, 3.0, 1.0), 1e-5));
    }
}
