//! Damped wave propagation over the ghost-bordered heightfield.
//!
//! One substep runs three kernels in order:
//! 1. [`compute_accelerations`]: discrete Laplacian per free sample.
//! 2. [`integrate_heights_and_velocities`]: damped velocity and height update,
//!    accumulating kinetic energy.
//! 3. [`absorb_boundaries`]: one-sided update of the ghost ring that damps
//!    reflections at open edges.
//!
//! ```text
//! a  = avg(h_left, h_right, h_down, h_up) − h
//! v += Δt · (c² / (dx·dz) · a − v · damping)
//! h += Δt · v · speedTweak + correction
//! ```

use rayon::prelude::*;

use crate::core_types::Vec2;
use crate::grid::{GridResolution, Heightfield};

use super::atomics::AtomicAccumulator;

/// Parameters of one propagation substep.
#[derive(Debug, Clone, Copy)]
pub struct WaveParams {
    /// Substep duration in seconds
    pub dt: f32,
    /// Wave propagation speed `c` in world units per second
    pub propagation_speed: f32,
    pub damping: f32,
    /// 0 keeps sharp crests, 1 clamps every acceleration into a height correction
    pub smoothness: f32,
    pub speed_tweak: f32,
    pub sample_size: Vec2,
}

/// `Δt/substeps < min(dx, dz) / c`. A zero speed is always stable.
pub fn is_stable(dt: f32, substeps: u32, sample_size: Vec2, propagation_speed: f32) -> bool {
    if propagation_speed <= 0.0 {
        return true;
    }
    dt / (substeps.max(1) as f32) < sample_size.x.min(sample_size.y) / propagation_speed
}

/// Writes `avg(4 neighbours) − h` for every free sample and zero for fixed ones.
///
/// # Arguments
///
/// * `heights` - Ghost-layout heights
/// * `accelerations` - Interior-layout output
/// * `fixed` - Interior-layout fixed mask
/// * `resolution` - Interior resolution
pub fn compute_accelerations(
    heights: &[f32],
    accelerations: &mut [f32],
    fixed: &[bool],
    resolution: GridResolution,
) {
    let gx = resolution.x + 2;
    accelerations
        .par_chunks_mut(resolution.x)
        .enumerate()
        .for_each(|(z, row)| {
            for (x, acc) in row.iter_mut().enumerate() {
                if fixed[z * resolution.x + x] {
                    *acc = 0.0;
                    continue;
                }
                let g = resolution.ghost_index(x, z);
                let avg =
                    (heights[g - 1] + heights[g + 1] + heights[g - gx] + heights[g + gx]) * 0.25;
                *acc = avg - heights[g];
            }
        });
}

/// Part of an acceleration beyond `±max_offset`, applied directly as a height
/// correction instead of through the velocity.
#[inline]
pub fn height_correction(acceleration: f32, max_offset: f32) -> f32 {
    if acceleration > max_offset {
        acceleration - max_offset
    } else if acceleration < -max_offset {
        acceleration + max_offset
    } else {
        0.0
    }
}

/// Advances velocities and heights of every free interior sample by one substep.
///
/// Kinetic energy `½v²` of each updated sample is added to `energy`.
pub fn integrate_heights_and_velocities(
    heights: &mut [f32],
    velocities: &mut [f32],
    accelerations: &[f32],
    fixed: &[bool],
    resolution: GridResolution,
    params: &WaveParams,
    energy: &AtomicAccumulator,
) {
    let gx = resolution.x + 2;
    let max_offset = (1.0 - params.smoothness) * params.sample_size.x.min(params.sample_size.y);
    let precalc = params.propagation_speed * params.propagation_speed
        / (params.sample_size.x * params.sample_size.y);
    let dt = params.dt;

    heights[gx..gx * (resolution.z + 1)]
        .par_chunks_mut(gx)
        .zip(velocities.par_chunks_mut(resolution.x))
        .enumerate()
        .for_each(|(z, (h_row, v_row))| {
            for x in 0..resolution.x {
                let i = z * resolution.x + x;
                if fixed[i] {
                    continue;
                }
                let mut acc = accelerations[i];
                let correction = height_correction(acc, max_offset);
                acc -= correction;

                let v = &mut v_row[x];
                *v += dt * (precalc * acc - *v * params.damping);
                h_row[x + 1] += dt * *v * params.speed_tweak + correction;
                energy.add_f32_scaled(0.5 * *v * *v);
            }
        });
}

/// Absorbing update of the ghost ring from the interior sample one step inward.
///
/// `h_ghost = (c·Δt·h_inner + h_ghost·cellSize) / (cellSize + c·Δt)`
pub fn absorb_boundaries(heights: &mut [f32], resolution: GridResolution, params: &WaveParams) {
    let ghost = resolution.ghost();
    let next_pos = params.propagation_speed * params.dt;
    let (last_x, last_z) = (ghost.x - 1, ghost.z - 1);

    let mut update = |x: usize, z: usize| {
        let inner_x = if x == 0 {
            1
        } else if x == last_x {
            x - 1
        } else {
            x
        };
        let inner_z = if z == 0 {
            1
        } else if z == last_z {
            z - 1
        } else {
            z
        };
        let cell_size = if z == 0 || z == last_z {
            params.sample_size.y
        } else {
            params.sample_size.x
        };
        let g = ghost.index(x, z);
        let inner = heights[ghost.index(inner_x, inner_z)];
        heights[g] = (next_pos * inner + heights[g] * cell_size) / (cell_size + next_pos);
    };

    for x in 0..ghost.x {
        update(x, 0);
        update(x, last_z);
    }
    for z in 1..last_z {
        update(0, z);
        update(last_x, z);
    }
}

/// Runs one full propagation substep on `field`. The energy accumulator is
/// reset first, so it holds the kinetic energy of this substep only.
pub fn step(field: &mut Heightfield, fixed: &[bool], params: &WaveParams, energy: &AtomicAccumulator) {
    let resolution = field.resolution();
    energy.reset();
    compute_accelerations(&field.heights, &mut field.accelerations, fixed, resolution);
    integrate_heights_and_velocities(
        &mut field.heights,
        &mut field.velocities,
        &field.accelerations,
        fixed,
        resolution,
        params,
        energy,
    );
    absorb_boundaries(&mut field.heights, resolution, params);
}
