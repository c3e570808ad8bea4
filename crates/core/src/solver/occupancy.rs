//! Occupancy kernels: how much of each detection column is filled by
//! interactors, and how changes of that filling push the water around.
//!
//! Every sample owns a vertical column that starts `detection_depth` below the
//! rest surface. Colliders crossing a column produce intervals
//! `[distance, distance + occupancy)` measured from the column bottom. The
//! union of all intervals drives the height perturbation; intervals of the
//! same rigid body are merged and handed to the buoyancy kernel.

use rayon::prelude::*;

use crate::collider::{column_occupancy, Collider};
use crate::core_types::{AffineTransform, Vec2, Vec3};
use crate::grid::{CellArea, GridResolution};

use super::atomics::AtomicFlag;
use super::interaction::{InteractionBlocks, InteractionData};

/// Occupancy below this is treated as no contact.
pub const MIN_OCCUPANCY: f32 = 0.0001;

/// Height offsets at or below this magnitude are not applied.
pub const HEIGHT_CHANGE_THRESHOLD: f32 = 0.0001;

/// One collider interval in one column, surface local units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnHit {
    pub collider: usize,
    pub occupancy: f32,
    pub distance: f32,
}

impl ColumnHit {
    #[inline]
    fn end(&self) -> f32 {
        self.distance + self.occupancy
    }
}

/// Merged interval of one rigid body in one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyHit {
    pub body: usize,
    pub occupancy: f32,
    pub distance: f32,
}

/// Inputs of [`raymarch_occupancy`].
#[derive(Debug, Clone, Copy)]
pub struct OccupancyParams {
    /// Surface local-to-world transform
    pub surface: AffineTransform,
    pub resolution: GridResolution,
    pub sample_size: Vec2,
    /// Column depth below the rest surface, local units
    pub detection_depth: f32,
    /// Samples to probe
    pub area: CellArea,
    /// Compute the merged occupancy that perturbs the heights
    pub affect_surface: bool,
    /// Collect per-body hits for buoyancy
    pub buoyancy: bool,
}

/// Total length covered by intervals sorted by ascending distance.
///
/// Intervals fully inside an earlier one are ignored and partial overlaps
/// only add their uncovered part.
pub fn merged_length(hits: &[ColumnHit]) -> f32 {
    let mut total = 0.0;
    let mut min_next = f32::NEG_INFINITY;
    for hit in hits {
        let end = hit.end();
        if end < min_next {
            continue;
        }
        total += if hit.distance < min_next {
            end - min_next
        } else {
            hit.occupancy
        };
        min_next = end;
    }
    total
}

/// Merges intervals of colliders sharing a rigid body.
///
/// `hits` must be sorted by ascending distance. Intervals of colliders
/// without a body are dropped. A body keeps several intervals when they are
/// disjoint along the column.
pub fn collapse_per_body(
    hits: &[ColumnHit],
    collider_to_body: &[Option<usize>],
    out: &mut Vec<BodyHit>,
) {
    out.clear();
    // (body, index of its latest interval in `out`)
    let mut latest: Vec<(usize, usize)> = Vec::new();

    for hit in hits {
        let Some(body) = collider_to_body.get(hit.collider).copied().flatten() else {
            continue;
        };
        let record = BodyHit {
            body,
            occupancy: hit.occupancy,
            distance: hit.distance,
        };
        match latest.iter_mut().find(|(b, _)| *b == body) {
            None => {
                out.push(record);
                latest.push((body, out.len() - 1));
            }
            Some(entry) => {
                let current = &mut out[entry.1];
                let current_end = current.distance + current.occupancy;
                if current_end < hit.distance {
                    out.push(record);
                    entry.1 = out.len() - 1;
                } else if hit.end() > current_end {
                    current.occupancy = hit.end() - current.distance;
                }
            }
        }
    }
}

/// Probes every free sample of `params.area` against all colliders.
///
/// Writes the merged occupancy of each probed sample into `occupancy`
/// (interior layout, expected zeroed) and appends per-body hits to `blocks`.
///
/// # Arguments
///
/// * `occupancy` - Output occupancy per sample, local units
/// * `colliders` - Colliders indexed by collider slot
/// * `collider_to_body` - Rigid-body slot of each collider slot
/// * `fixed` - Fixed mask, fixed samples are not probed
/// * `blocks` - Per-body hit blocks, reset by the caller
/// * `params` - Surface placement and probe options
pub fn raymarch_occupancy(
    occupancy: &mut [f32],
    colliders: &[Collider],
    collider_to_body: &[Option<usize>],
    fixed: &[bool],
    blocks: &InteractionBlocks,
    params: &OccupancyParams,
) {
    let res = params.resolution;
    let area = params.area;
    if area.is_empty() || colliders.is_empty() {
        return;
    }
    let scale = params.surface.scale;
    let depth_scale = scale.y.abs().max(f32::EPSILON);
    let up = params.surface.up();
    let border = (params.sample_size.x * scale.x.abs()).max(params.sample_size.y * scale.z.abs());
    let depth_ws = params.detection_depth * depth_scale;

    occupancy
        .par_chunks_mut(res.x)
        .enumerate()
        .skip(area.offset_z)
        .take(area.depth)
        .for_each(|(z, row)| {
            let mut hits: Vec<ColumnHit> = Vec::with_capacity(colliders.len());
            let mut body_hits: Vec<BodyHit> = Vec::with_capacity(colliders.len());

            for x in area.offset_x..area.offset_x + area.width {
                let cell = res.index(x, z);
                if fixed[cell] {
                    continue;
                }
                let bottom = params.surface.transform_point(Vec3::new(
                    x as f32 * params.sample_size.x,
                    -params.detection_depth,
                    z as f32 * params.sample_size.y,
                ));

                hits.clear();
                for (slot, collider) in colliders.iter().enumerate() {
                    let Some(column) = column_occupancy(collider, bottom, up, depth_ws, border) else {
                        continue;
                    };
                    if column.occupancy > MIN_OCCUPANCY {
                        hits.push(ColumnHit {
                            collider: slot,
                            occupancy: column.occupancy / depth_scale,
                            distance: column.distance / depth_scale,
                        });
                    }
                }
                if hits.is_empty() {
                    continue;
                }
                hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

                if params.affect_surface {
                    row[x] = merged_length(&hits);
                }
                if params.buoyancy {
                    collapse_per_body(&hits, collider_to_body, &mut body_hits);
                    for hit in &body_hits {
                        blocks.add_hit(
                            hit.body,
                            InteractionData {
                                cell_index: cell as i32,
                                occupancy: hit.occupancy,
                                distance: hit.distance,
                            },
                        );
                    }
                }
            }
        });

    blocks.finish();
}

/// Pushes water out of newly occupied samples and into released ones.
///
/// Each free sample moves by `effect_scale · 0.25 · Σ(occupancy − previous)`
/// over its in-bounds 4-neighbours. Raises `activity` when any sample moves.
pub fn apply_occupancy_effect(
    heights: &mut [f32],
    occupancy: &[f32],
    previous: &[f32],
    fixed: &[bool],
    resolution: GridResolution,
    effect_scale: f32,
    activity: &AtomicFlag,
) {
    let gx = resolution.x + 2;
    let delta = |x: usize, z: usize| {
        let i = resolution.index(x, z);
        occupancy[i] - previous[i]
    };

    heights[gx..gx * (resolution.z + 1)]
        .par_chunks_mut(gx)
        .enumerate()
        .for_each(|(z, row)| {
            for x in 0..resolution.x {
                if fixed[resolution.index(x, z)] {
                    continue;
                }
                let mut offset = 0.0;
                if x > 0 {
                    offset += 0.25 * delta(x - 1, z);
                }
                if x + 1 < resolution.x {
                    offset += 0.25 * delta(x + 1, z);
                }
                if z > 0 {
                    offset += 0.25 * delta(x, z - 1);
                }
                if z + 1 < resolution.z {
                    offset += 0.25 * delta(x, z + 1);
                }
                if offset.abs() > HEIGHT_CHANGE_THRESHOLD {
                    row[x + 1] += offset * effect_scale;
                    activity.try_set_flag();
                }
            }
        });
}
