//! Axis-aligned bounding boxes.

use super::transform::AffineTransform;
use super::vec3::Vec3;

/// World or local axis-aligned box given by its corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        let extents = extents.abs();
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point. Returns `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.inf(&p),
            max: acc.max.sup(&p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this world box expressed in the local space of `transform`.
    pub fn to_local(&self, transform: &AffineTransform) -> Self {
        let corners = self.corners().map(|c| transform.inverse_transform_point(c));
        Self::from_points(corners).unwrap_or(*self)
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Whether the boxes overlap, touching faces included.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_covers_all() {
        let b = Aabb::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 3.0, 2.0),
            Vec3::new(0.0, 0.0, -4.0),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(b.max, Vec3::new(1.0, 3.0, 2.0));
        assert!(b.contains(Vec3::zeros()));
    }

    #[test]
    fn test_intersects() {
        let a = Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        let b = Aabb::from_center_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::repeat(1.0));
        let c = Aabb::from_center_extents(Vec3::new(3.5, 0.0, 0.0), Vec3::repeat(1.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_to_local_undoes_translation_and_scale() {
        let t = AffineTransform::from_translation(Vec3::new(10.0, 0.0, 10.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));
        let world = Aabb::from_center_extents(Vec3::new(12.0, 0.0, 12.0), Vec3::repeat(2.0));
        let local = world.to_local(&t);
        assert!((local.center() - Vec3::new(1.0, 0.0, 1.0)).norm() < 1e-5);
        assert!((local.max - local.min - Vec3::repeat(2.0)).norm() < 1e-5);
    }
}
