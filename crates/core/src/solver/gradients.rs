//! Surface slopes, normals and tangents from central differences.

use rayon::prelude::*;

use crate::core_types::{Vec3, Vec4};
use crate::grid::Heightfield;

/// Recomputes gradients, normals and tangents of every interior sample.
///
/// Samples on the grid edge read their ghost neighbours. Both axes are scaled
/// by `1 / (2·dx)`.
pub fn compute_gradients(field: &mut Heightfield) {
    let resolution = field.resolution();
    let norm = 1.0 / (2.0 * field.sample_size().x);
    let gx = resolution.x + 2;
    let heights = &field.heights;

    field
        .gradients
        .par_chunks_mut(resolution.x)
        .zip(field.normals.par_chunks_mut(resolution.x))
        .zip(field.tangents.par_chunks_mut(resolution.x))
        .enumerate()
        .for_each(|(z, ((gradients, normals), tangents))| {
            for x in 0..resolution.x {
                let g = resolution.ghost_index(x, z);
                let dx = (heights[g - 1] - heights[g + 1]) * norm;
                let dz = (heights[g - gx] - heights[g + gx]) * norm;

                let slope = Vec3::new(dx, 0.0, dz);
                gradients[x] = Vec3::new(dx, slope.norm(), dz);
                // (0, -dz, 1) x (1, -dx, 0)
                normals[x] = Vec3::new(dx, 1.0, dz).normalize();
                let t = Vec3::new(1.0, -dx, 0.0).normalize();
                tangents[x] = Vec4::new(t.x, t.y, t.z, 1.0);
            }
        });
}
