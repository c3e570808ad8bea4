//! Fixed-cell mask shared between surfaces.
//!
//! A fixed sample is excluded from wave propagation and from every interaction
//! kernel (piers, shorelines). The mask is read concurrently by simulating
//! surfaces and mutated only while at least one [`MaskRequest`] is alive.
//! Replacing the whole array (resize, image import) is only allowed when no
//! request is outstanding.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use image::{GrayImage, Luma};
use tracing::{debug, error};

use crate::error::{Result, WaveSimError};

use super::resolution::GridResolution;

#[derive(Debug)]
struct MaskState {
    resolution: GridResolution,
    cells: Vec<bool>,
}

/// Boolean grid marking samples excluded from simulation.
#[derive(Debug)]
pub struct FixedMask {
    state: RwLock<MaskState>,
    requests: AtomicUsize,
}

/// Outstanding data request on a [`FixedMask`].
///
/// Mutations are accepted while any request is alive. Dropping the guard
/// releases the request.
#[derive(Debug)]
pub struct MaskRequest {
    mask: Arc<FixedMask>,
}

impl MaskRequest {
    pub fn mask(&self) -> &Arc<FixedMask> {
        &self.mask
    }
}

impl std::ops::Deref for MaskRequest {
    type Target = FixedMask;

    fn deref(&self) -> &FixedMask {
        &self.mask
    }
}

impl Drop for MaskRequest {
    fn drop(&mut self) {
        let previous = self.mask.requests.fetch_sub(1, Ordering::AcqRel);
        debug!(remaining = previous - 1, "Fixed mask request released");
    }
}

/// Read access to the mask cells, held for the duration of a tick.
pub struct MaskView<'a> {
    guard: RwLockReadGuard<'a, MaskState>,
}

impl MaskView<'_> {
    pub fn resolution(&self) -> GridResolution {
        self.guard.resolution
    }
}

impl std::ops::Deref for MaskView<'_> {
    type Target = [bool];

    fn deref(&self) -> &[bool] {
        &self.guard.cells
    }
}

impl FixedMask {
    /// Creates a mask with every sample free.
    pub fn new(resolution: GridResolution) -> Self {
        Self {
            state: RwLock::new(MaskState {
                resolution,
                cells: vec![false; resolution.sample_count()],
            }),
            requests: AtomicUsize::new(0),
        }
    }

    /// Creates a shareable mask.
    pub fn shared(resolution: GridResolution) -> Arc<Self> {
        Arc::new(Self::new(resolution))
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MaskState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MaskState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_requested(&self) -> Result<()> {
        if self.requests.load(Ordering::Acquire) == 0 {
            error!("Fixed mask mutated without an outstanding request");
            return Err(WaveSimError::MaskNotRequested);
        }
        Ok(())
    }

    /// Must be called with the write lock held.
    fn ensure_unused(&self) -> Result<()> {
        let requests = self.requests.load(Ordering::Acquire);
        if requests > 0 {
            error!(requests, "Fixed mask replaced while requests are outstanding");
            return Err(WaveSimError::MaskInUse { requests });
        }
        Ok(())
    }

    /// Opens a data request. Mutations are allowed until every request is dropped.
    ///
    /// The count is raised under the read lock, so it cannot interleave with a
    /// resize or import holding the write lock.
    pub fn request_data(self: &Arc<Self>) -> MaskRequest {
        let _state = self.read_state();
        let count = self.requests.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(requests = count, "Fixed mask requested");
        MaskRequest {
            mask: Arc::clone(self),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Acquire)
    }

    pub fn resolution(&self) -> GridResolution {
        self.read_state().resolution
    }

    pub fn view(&self) -> MaskView<'_> {
        MaskView {
            guard: self.read_state(),
        }
    }

    /// Whether sample `index` is fixed. Out-of-range indices read as free.
    pub fn is_fixed(&self, index: usize) -> bool {
        self.read_state().cells.get(index).copied().unwrap_or(false)
    }

    pub fn fixed_count(&self) -> usize {
        self.read_state().cells.iter().filter(|c| **c).count()
    }

    /// Marks one sample fixed or free.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskNotRequested`] without an outstanding request,
    /// [`WaveSimError::SampleOutOfRange`] for an invalid index.
    pub fn set_fixed(&self, index: usize, fixed: bool) -> Result<()> {
        self.ensure_requested()?;
        let mut state = self.write_state();
        state.resolution.check_index(index)?;
        state.cells[index] = fixed;
        Ok(())
    }

    /// Marks every sample fixed or free.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskNotRequested`] without an outstanding request.
    pub fn set_all(&self, fixed: bool) -> Result<()> {
        self.ensure_requested()?;
        self.write_state().cells.fill(fixed);
        Ok(())
    }

    /// Fixes the outermost ring of samples.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskNotRequested`] without an outstanding request.
    pub fn fix_borders(&self) -> Result<()> {
        self.ensure_requested()?;
        let mut state = self.write_state();
        let res = state.resolution;
        for z in 0..res.z {
            for x in 0..res.x {
                if x == 0 || z == 0 || x == res.x - 1 || z == res.z - 1 {
                    state.cells[res.index(x, z)] = true;
                }
            }
        }
        Ok(())
    }

    /// Grows fixed regions by one sample over the 8-neighbourhood.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskNotRequested`] without an outstanding request.
    pub fn dilate(&self) -> Result<()> {
        self.ensure_requested()?;
        let mut state = self.write_state();
        state.cells = morph(&state.cells, state.resolution, true);
        Ok(())
    }

    /// Shrinks fixed regions by one sample over the 8-neighbourhood.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskNotRequested`] without an outstanding request.
    pub fn erode(&self) -> Result<()> {
        self.ensure_requested()?;
        let mut state = self.write_state();
        state.cells = morph(&state.cells, state.resolution, false);
        Ok(())
    }

    /// Changes the resolution, remapping existing values from the nearest scaled sample.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskInUse`] while any request is outstanding,
    /// [`WaveSimError::InvalidGeometry`] for a zero axis.
    pub fn resize(&self, x: usize, z: usize) -> Result<GridResolution> {
        let target = GridResolution::new(x, z)?;
        let mut state = self.write_state();
        self.ensure_unused()?;
        if target == state.resolution {
            return Ok(target);
        }
        let old = state.resolution;
        let cells = (0..target.sample_count())
            .map(|i| state.cells[target.scaled_index(i, &old)])
            .collect();
        state.cells = cells;
        state.resolution = target;
        debug!(x = target.x, z = target.z, "Fixed mask resized");
        Ok(target)
    }

    /// Exports the mask as a grayscale image, 255 for fixed and 0 for free.
    /// Pixel `(x, z)` maps to sample `(x, z)`.
    pub fn to_image(&self) -> GrayImage {
        let state = self.read_state();
        let res = state.resolution;
        GrayImage::from_fn(res.x as u32, res.z as u32, |x, z| {
            let fixed = state.cells[res.index(x as usize, z as usize)];
            Luma([if fixed { 255 } else { 0 }])
        })
    }

    /// Replaces the mask with an image, resizing to its dimensions. Any non-zero
    /// pixel marks a fixed sample.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::MaskInUse`] while any request is outstanding,
    /// [`WaveSimError::InvalidGeometry`] when the image is outside the supported resolution range.
    pub fn from_image(&self, image: &GrayImage) -> Result<()> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let in_range = |v: usize| (GridResolution::MIN..=GridResolution::MAX).contains(&v);
        if !in_range(w) || !in_range(h) {
            return Err(WaveSimError::InvalidGeometry(format!(
                "mask image of {w}x{h} is outside the supported resolution range"
            )));
        }
        let res = GridResolution { x: w, z: h };
        let mut state = self.write_state();
        self.ensure_unused()?;
        state.resolution = res;
        state.cells = (0..res.sample_count())
            .map(|i| {
                let (x, z) = res.coords(i);
                image.get_pixel(x as u32, z as u32).0[0] > 0
            })
            .collect();
        Ok(())
    }

    /// Writes the mask to a PNG file.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::Image`] when encoding or writing fails.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_image().save(path)?;
        Ok(())
    }

    /// Loads the mask from an image file, see [`FixedMask::from_image`].
    ///
    /// # Errors
    ///
    /// [`WaveSimError::Image`] when decoding fails, otherwise as `from_image`.
    pub fn load_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = image::open(path)?.into_luma8();
        self.from_image(&image)
    }
}

/// Dilation (`grow = true`) or erosion over the in-bounds 8-neighbourhood.
fn morph(cells: &[bool], res: GridResolution, grow: bool) -> Vec<bool> {
    (0..cells.len())
        .map(|i| {
            if cells[i] == grow {
                return grow;
            }
            let (x, z) = res.coords(i);
            let touches = (-1i64..=1).any(|dz| {
                (-1i64..=1).any(|dx| {
                    let (nx, nz) = (x as i64 + dx, z as i64 + dz);
                    res.contains(nx, nz) && cells[res.index(nx as usize, nz as usize)] == grow
                })
            });
            if touches {
                grow
            } else {
                cells[i]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(x: usize, z: usize) -> Arc<FixedMask> {
        FixedMask::shared(GridResolution::new(x, z).unwrap())
    }

    #[test]
    fn test_set_fixed_requires_request() {
        let m = mask(5, 5);
        assert!(matches!(
            m.set_fixed(3, true),
            Err(WaveSimError::MaskNotRequested)
        ));
        assert!(!m.is_fixed(3));

        let request = m.request_data();
        request.set_fixed(3, true).unwrap();
        assert!(m.is_fixed(3));
        assert_eq!(m.request_count(), 1);
        drop(request);
        assert_eq!(m.request_count(), 0);
        assert!(m.set_all(true).is_err());
    }

    #[test]
    fn test_set_fixed_out_of_range() {
        let m = mask(5, 5);
        let _request = m.request_data();
        assert!(matches!(
            m.set_fixed(25, true),
            Err(WaveSimError::SampleOutOfRange { .. })
        ));
    }

    #[test]
    fn test_resize_fails_while_requested() {
        let m = mask(4, 4);
        let request = m.request_data();
        let second = m.request_data();
        assert!(matches!(
            m.resize(8, 8),
            Err(WaveSimError::MaskInUse { requests: 2 })
        ));
        assert_eq!(m.resolution(), GridResolution { x: 4, z: 4 });
        drop(second);
        drop(request);
        assert_eq!(m.resize(8, 8).unwrap(), GridResolution { x: 8, z: 8 });
    }

    #[test]
    fn test_resize_remaps_nearest() {
        let m = mask(4, 4);
        {
            let _r = m.request_data();
            m.set_fixed(GridResolution { x: 4, z: 4 }.index(3, 3), true).unwrap();
        }
        m.resize(8, 8).unwrap();
        let res = m.resolution();
        assert!(m.is_fixed(res.index(6, 6)));
        assert!(m.is_fixed(res.index(7, 7)));
        assert!(!m.is_fixed(res.index(5, 5)));
        assert_eq!(m.fixed_count(), 4);
    }

    #[test]
    fn test_resize_down_keeps_corners_aligned() {
        let m = mask(8, 8);
        let old = GridResolution { x: 8, z: 8 };
        {
            let _r = m.request_data();
            m.set_fixed(old.index(5, 7), true).unwrap();
            m.set_fixed(old.index(4, 0), true).unwrap();
        }
        m.resize(4, 4).unwrap();
        let res = m.resolution();
        // Sample 2 reads old sample round(7 * 2/3) = 5
        assert!(m.is_fixed(res.index(2, 3)));
        assert!(!m.is_fixed(res.index(2, 0)));
        assert_eq!(m.fixed_count(), 1);
    }

    #[test]
    fn test_resize_never_overlaps_open_request() {
        let m = mask(8, 8);
        let resizer = {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for i in 0..2000 {
                    let size = if i % 2 == 0 { 4 } else { 8 };
                    let _ = m.resize(size, size);
                }
            })
        };
        for _ in 0..2000 {
            let request = m.request_data();
            let before = request.resolution();
            std::thread::yield_now();
            assert_eq!(request.resolution(), before);
            assert_eq!(request.view().len(), before.sample_count());
        }
        resizer.join().unwrap();
    }

    #[test]
    fn test_fix_borders_then_erode_and_dilate() {
        let m = mask(5, 5);
        let _r = m.request_data();
        m.fix_borders().unwrap();
        assert_eq!(m.fixed_count(), 16);
        m.dilate().unwrap();
        assert_eq!(m.fixed_count(), 24);
        assert!(!m.is_fixed(12));
        m.erode().unwrap();
        assert_eq!(m.fixed_count(), 16);
        m.set_all(false).unwrap();
        m.set_fixed(12, true).unwrap();
        m.dilate().unwrap();
        assert_eq!(m.fixed_count(), 9);
    }

    #[test]
    fn test_image_round_trip() {
        let m = mask(7, 5);
        {
            let _r = m.request_data();
            m.set_fixed(0, true).unwrap();
            m.set_fixed(9, true).unwrap();
            m.set_fixed(34, true).unwrap();
        }
        let image = m.to_image();
        assert_eq!(image.dimensions(), (7, 5));

        let other = mask(3, 3);
        other.from_image(&image).unwrap();
        assert_eq!(other.resolution(), m.resolution());
        assert_eq!(&*other.view(), &*m.view());
    }

    #[test]
    fn test_import_rejected_while_requested() {
        let m = mask(5, 5);
        let image = m.to_image();
        let _r = m.request_data();
        assert!(m.from_image(&image).is_err());
    }
}
