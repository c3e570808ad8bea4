//! Grid resolution and index mapping between interior and ghost layouts.
//!
//! Interior samples are stored row-major with `x` varying fastest. The ghost
//! layout adds one cell on every side, so interior sample `(x, z)` lives at
//! ghost coordinates `(x + 1, z + 1)`.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, WaveSimError};

/// Number of samples along X and Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridResolution {
    pub x: usize,
    pub z: usize,
}

impl Default for GridResolution {
    fn default() -> Self {
        Self { x: 50, z: 50 }
    }
}

impl GridResolution {
    /// Smallest supported samples per axis.
    pub const MIN: usize = 3;
    /// Largest supported samples per axis.
    pub const MAX: usize = 256;
    /// Largest supported sample count.
    pub const MAX_SAMPLES: usize = Self::MAX * Self::MAX;

    /// Creates a resolution, clamping each axis into `[MIN, MAX]`.
    ///
    /// # Errors
    ///
    /// Returns [`WaveSimError::InvalidGeometry`] when an axis is zero.
    pub fn new(x: usize, z: usize) -> Result<Self> {
        if x == 0 || z == 0 {
            return Err(WaveSimError::InvalidGeometry(format!(
                "resolution must be positive, got {x}x{z}"
            )));
        }
        let clamped = Self {
            x: x.clamp(Self::MIN, Self::MAX),
            z: z.clamp(Self::MIN, Self::MAX),
        };
        if clamped.x != x || clamped.z != z {
            warn!(
                requested_x = x,
                requested_z = z,
                x = clamped.x,
                z = clamped.z,
                "Resolution outside supported range, clamped"
            );
        }
        Ok(clamped)
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.x * self.z
    }

    /// Resolution including the one-cell ghost border.
    #[inline]
    pub fn ghost(&self) -> Self {
        Self {
            x: self.x + 2,
            z: self.z + 2,
        }
    }

    #[inline]
    pub fn index(&self, x: usize, z: usize) -> usize {
        z * self.x + x
    }

    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.x, index / self.x)
    }

    /// Ghost-layout index of interior sample `(x, z)`.
    #[inline]
    pub fn ghost_index(&self, x: usize, z: usize) -> usize {
        (z + 1) * (self.x + 2) + x + 1
    }

    #[inline]
    pub fn ghost_index_from_index(&self, index: usize) -> usize {
        let (x, z) = self.coords(index);
        self.ghost_index(x, z)
    }

    #[inline]
    pub fn contains(&self, x: i64, z: i64) -> bool {
        x >= 0 && z >= 0 && (x as usize) < self.x && (z as usize) < self.z
    }

    /// Flat interior index for signed coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`WaveSimError::SampleOutOfRange`] when `(x, z)` is outside the grid.
    pub fn checked_index(&self, x: i64, z: i64) -> Result<usize> {
        if self.contains(x, z) {
            Ok(self.index(x as usize, z as usize))
        } else {
            Err(WaveSimError::SampleOutOfRange {
                x,
                z,
                width: self.x,
                depth: self.z,
            })
        }
    }

    /// Validates a flat interior index.
    ///
    /// # Errors
    ///
    /// Returns [`WaveSimError::SampleOutOfRange`] when `index` is past the last sample.
    pub fn check_index(&self, index: usize) -> Result<usize> {
        if index < self.sample_count() {
            Ok(index)
        } else {
            Err(WaveSimError::SampleOutOfRange {
                x: (index % self.x) as i64,
                z: (index / self.x) as i64,
                width: self.x,
                depth: self.z,
            })
        }
    }

    /// Maps an index of this resolution to the nearest index of `target`.
    ///
    /// Coordinates are normalized corner to corner, so the last sample of one
    /// resolution always lands on the last sample of the other.
    pub fn scaled_index(&self, index: usize, target: &Self) -> usize {
        if self == target {
            return index;
        }
        let (x, z) = self.coords(index);
        let scale = |v: usize, from: usize, to: usize| {
            let norm = v as f32 / (from - 1) as f32;
            (((to - 1) as f32 * norm).round_ties_even() as usize).min(to - 1)
        };
        target.index(scale(x, self.x, target.x), scale(z, self.z, target.z))
    }
}
