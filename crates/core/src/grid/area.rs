//! Rectangular cell areas touched by interactors.

use crate::core_types::{Aabb, Vec2};

use super::resolution::GridResolution;

/// Axis-aligned block of samples starting at `(offset_x, offset_z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellArea {
    pub offset_x: usize,
    pub offset_z: usize,
    pub width: usize,
    pub depth: usize,
}

impl CellArea {
    pub fn full(resolution: GridResolution) -> Self {
        Self {
            offset_x: 0,
            offset_z: 0,
            width: resolution.x,
            depth: resolution.z,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.depth == 0
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.depth
    }

    #[inline]
    pub fn contains(&self, x: usize, z: usize) -> bool {
        x >= self.offset_x
            && z >= self.offset_z
            && x < self.offset_x + self.width
            && z < self.offset_z + self.depth
    }

    /// Samples covered by local-space bounds, snapped to the nearest sample on
    /// each side. Returns `None` when the bounds miss the surface rectangle.
    pub fn from_local_bounds(
        bounds: &Aabb,
        resolution: GridResolution,
        sample_size: Vec2,
    ) -> Option<Self> {
        let size_x = (resolution.x - 1) as f32 * sample_size.x;
        let size_z = (resolution.z - 1) as f32 * sample_size.y;
        if bounds.max.x < 0.0 || bounds.max.z < 0.0 || bounds.min.x > size_x || bounds.min.z > size_z
        {
            return None;
        }
        let nearest = |v: f32, spacing: f32, count: usize| -> usize {
            ((v / spacing).round().max(0.0) as usize).min(count - 1)
        };
        let x0 = nearest(bounds.min.x, sample_size.x, resolution.x);
        let x1 = nearest(bounds.max.x, sample_size.x, resolution.x);
        let z0 = nearest(bounds.min.z, sample_size.y, resolution.z);
        let z1 = nearest(bounds.max.z, sample_size.y, resolution.z);
        Some(Self {
            offset_x: x0,
            offset_z: z0,
            width: x1 - x0 + 1,
            depth: z1 - z0 + 1,
        })
    }

    /// Smallest area containing both.
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.offset_x.min(other.offset_x);
        let z0 = self.offset_z.min(other.offset_z);
        let x1 = (self.offset_x + self.width).max(other.offset_x + other.width);
        let z1 = (self.offset_z + self.depth).max(other.offset_z + other.depth);
        Self {
            offset_x: x0,
            offset_z: z0,
            width: x1 - x0,
            depth: z1 - z0,
        }
    }

    /// Grows the area by `by` samples on every side, clamped to the grid.
    pub fn expanded(&self, by: usize, resolution: GridResolution) -> Self {
        if self.is_empty() {
            return *self;
        }
        let x0 = self.offset_x.saturating_sub(by);
        let z0 = self.offset_z.saturating_sub(by);
        let x1 = (self.offset_x + self.width + by).min(resolution.x);
        let z1 = (self.offset_z + self.depth + by).min(resolution.z);
        Self {
            offset_x: x0,
            offset_z: z0,
            width: x1 - x0,
            depth: z1 - z0,
        }
    }

    /// Iterates `(x, z)` sample coordinates row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.offset_z..self.offset_z + self.depth)
            .flat_map(move |z| (self.offset_x..self.offset_x + self.width).map(move |x| (x, z)))
    }
}
