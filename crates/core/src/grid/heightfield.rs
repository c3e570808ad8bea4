//! Heightfield buffers of a water surface.
//!
//! Heights use the ghost layout (`resolution + 2` per axis) so the interior
//! update never branches on edges. Velocities, accelerations and the derived
//! gradient/normal/tangent arrays use the interior layout.

use crate::core_types::{Vec2, Vec3, Vec4};
use crate::error::{Result, WaveSimError};

use super::resolution::GridResolution;

/// Grid storage plus derived per-sample shading data.
#[derive(Debug, Clone)]
pub struct Heightfield {
    resolution: GridResolution,
    size: Vec2,
    sample_size: Vec2,
    pub(crate) heights: Vec<f32>,
    pub(crate) velocities: Vec<f32>,
    pub(crate) accelerations: Vec<f32>,
    /// `(d/dx, slope magnitude, d/dz)` per sample.
    pub(crate) gradients: Vec<Vec3>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) tangents: Vec<Vec4>,
}

impl Heightfield {
    /// Creates a flat heightfield covering `size` world units in local space.
    ///
    /// # Errors
    ///
    /// Returns [`WaveSimError::InvalidGeometry`] when either size component is not
    /// strictly positive and finite.
    pub fn new(resolution: GridResolution, size: Vec2) -> Result<Self> {
        if !(size.x > 0.0 && size.y > 0.0 && size.x.is_finite() && size.y.is_finite()) {
            return Err(WaveSimError::InvalidGeometry(format!(
                "surface size must be positive, got {}x{}",
                size.x, size.y
            )));
        }
        let sample_size = Vec2::new(
            size.x / (resolution.x - 1) as f32,
            size.y / (resolution.z - 1) as f32,
        );
        let n = resolution.sample_count();
        Ok(Self {
            resolution,
            size,
            sample_size,
            heights: vec![0.0; resolution.ghost().sample_count()],
            velocities: vec![0.0; n],
            accelerations: vec![0.0; n],
            gradients: vec![Vec3::zeros(); n],
            normals: vec![Vec3::y(); n],
            tangents: vec![Vec4::new(1.0, 0.0, 0.0, 1.0); n],
        })
    }

    #[inline]
    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Distance between neighbouring samples along X (`x`) and Z (`y`).
    #[inline]
    pub fn sample_size(&self) -> Vec2 {
        self.sample_size
    }

    /// Local position of interior sample `(x, z)` at rest height.
    #[inline]
    pub fn sample_position(&self, x: usize, z: usize) -> Vec3 {
        Vec3::new(
            x as f32 * self.sample_size.x,
            0.0,
            z as f32 * self.sample_size.y,
        )
    }

    /// Height of interior sample `index`.
    #[inline]
    pub fn height(&self, index: usize) -> f32 {
        self.heights[self.resolution.ghost_index_from_index(index)]
    }

    #[inline]
    pub fn add_height(&mut self, index: usize, offset: f32) {
        let g = self.resolution.ghost_index_from_index(index);
        self.heights[g] += offset;
    }

    /// Heights including the ghost border.
    pub fn ghost_heights(&self) -> &[f32] {
        &self.heights
    }

    /// Interior heights in row-major order.
    pub fn interior_heights(&self) -> Vec<f32> {
        (0..self.resolution.sample_count())
            .map(|i| self.height(i))
            .collect()
    }

    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    pub fn accelerations(&self) -> &[f32] {
        &self.accelerations
    }

    pub fn gradients(&self) -> &[Vec3] {
        &self.gradients
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn tangents(&self) -> &[Vec4] {
        &self.tangents
    }

    /// Zeroes heights, velocities and accelerations.
    pub fn reset(&mut self) {
        self.heights.fill(0.0);
        self.velocities.fill(0.0);
        self.accelerations.fill(0.0);
    }
}
