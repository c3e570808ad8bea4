//! Velocity-transfer kernels: colliders push the water with their relative
//! velocity. The surface never pushes back in this mode.

use rayon::prelude::*;

use crate::collider::Collider;
use crate::core_types::{normalize_or_zero, AffineTransform, Vec2, Vec3};
use crate::grid::{CellArea, GridResolution};

use super::atomics::AtomicFlag;

/// Rigid motion of a collider or of the surface itself.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RigidMotion {
    pub linear: Vec3,
    pub angular: Vec3,
    /// Point the angular velocity rotates about, world space
    pub pivot: Vec3,
}

impl RigidMotion {
    #[inline]
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear + self.angular.cross(&(point - self.pivot))
    }
}

/// A collider together with its current motion.
#[derive(Debug, Clone)]
pub struct MovingCollider<'a> {
    pub collider: &'a Collider,
    pub motion: RigidMotion,
}

#[derive(Debug, Clone, Copy)]
pub struct VelocityTransferParams {
    pub surface: AffineTransform,
    pub surface_motion: RigidMotion,
    pub resolution: GridResolution,
    pub sample_size: Vec2,
    pub min_speed: f32,
    pub max_speed: f32,
}

/// Averages relative velocities of colliders containing each free sample of
/// `area`, written in surface local space.
///
/// Relative speeds above `max_speed` are clamped. Speeds below `min_speed`
/// contribute nothing but still count toward the average.
pub fn sample_velocities(
    relative: &mut [Vec3],
    colliders: &[MovingCollider<'_>],
    fixed: &[bool],
    area: CellArea,
    params: &VelocityTransferParams,
) {
    let res = params.resolution;
    if area.is_empty() || colliders.is_empty() {
        return;
    }
    let min_sq = params.min_speed * params.min_speed;

    relative
        .par_chunks_mut(res.x)
        .enumerate()
        .skip(area.offset_z)
        .take(area.depth)
        .for_each(|(z, row)| {
            for x in area.offset_x..area.offset_x + area.width {
                if fixed[res.index(x, z)] {
                    continue;
                }
                let point = params.surface.transform_point(Vec3::new(
                    x as f32 * params.sample_size.x,
                    0.0,
                    z as f32 * params.sample_size.y,
                ));
                let surface_velocity = params.surface_motion.velocity_at(point);

                let mut sum = Vec3::zeros();
                let mut inside = 0u32;
                for moving in colliders {
                    if !moving.collider.contains(point) {
                        continue;
                    }
                    inside += 1;
                    let mut v = moving.motion.velocity_at(point) - surface_velocity;
                    let speed_sq = v.norm_squared();
                    if speed_sq < min_sq {
                        continue;
                    }
                    if speed_sq > params.max_speed * params.max_speed {
                        v = v / speed_sq.sqrt() * params.max_speed;
                    }
                    sum += params.surface.inverse_transform_direction(v);
                }
                if inside > 0 {
                    row[x] = sum / inside as f32;
                }
            }
        });
}

/// Neighbour offsets of the 8-neighbourhood.
const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Turns sampled relative velocities into height changes.
///
/// A sample moves by its own vertical velocity and is pushed or pulled by
/// each neighbour whose horizontal velocity points toward or away from it.
/// Raises `activity` when any sample changes.
#[allow(clippy::too_many_arguments)]
pub fn heights_from_velocities(
    heights: &mut [f32],
    relative: &[Vec3],
    fixed: &[bool],
    area: CellArea,
    resolution: GridResolution,
    vertical_push: f32,
    horizontal_push: f32,
    dt: f32,
    activity: &AtomicFlag,
) {
    if area.is_empty() {
        return;
    }
    let gx = resolution.x + 2;

    heights[gx..gx * (resolution.z + 1)]
        .par_chunks_mut(gx)
        .enumerate()
        .skip(area.offset_z)
        .take(area.depth)
        .for_each(|(z, row)| {
            for x in area.offset_x..area.offset_x + area.width {
                let i = resolution.index(x, z);
                if fixed[i] {
                    continue;
                }
                let mut changed = false;

                let change = relative[i].y * vertical_push * dt;
                if change.abs() > f32::EPSILON {
                    row[x + 1] += change;
                    changed = true;
                }

                for (ox, oz) in NEIGHBOURS {
                    let (nx, nz) = (x as i64 + ox, z as i64 + oz);
                    if !resolution.contains(nx, nz) {
                        continue;
                    }
                    let other = relative[resolution.index(nx as usize, nz as usize)];
                    if other.x == 0.0 && other.z == 0.0 {
                        continue;
                    }
                    let magnitude = other.norm() * horizontal_push * dt;
                    let flow = normalize_or_zero(Vec3::new(other.x, 0.0, other.z));
                    let toward = Vec3::new(-ox as f32, 0.0, -oz as f32).normalize();
                    let change = flow.dot(&toward) * magnitude;
                    if change.abs() > f32::EPSILON {
                        row[x + 1] += change;
                        changed = true;
                    }
                }

                if changed {
                    activity.try_set_flag();
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(res: GridResolution) -> VelocityTransferParams {
        VelocityTransferParams {
            surface: AffineTransform::identity(),
            surface_motion: RigidMotion::default(),
            resolution: res,
            sample_size: Vec2::new(1.0, 1.0),
            min_speed: 0.001,
            max_speed: 100.0,
        }
    }

    fn sphere_at(p: Vec3) -> Collider {
        Collider::sphere(1.0, AffineTransform::from_translation(p))
    }

    #[test]
    fn test_sample_inside_collider_only() {
        let res = GridResolution::new(9, 9).unwrap();
        let collider = sphere_at(Vec3::new(4.0, 0.0, 4.0));
        let moving = [MovingCollider {
            collider: &collider,
            motion: RigidMotion {
                linear: Vec3::new(0.0, -2.0, 0.0),
                ..Default::default()
            },
        }];
        let mut relative = vec![Vec3::zeros(); 81];
        let fixed = vec![false; 81];
        sample_velocities(&mut relative, &moving, &fixed, CellArea::full(res), &params(res));
        assert_relative_eq!(relative[res.index(4, 4)].y, -2.0);
        assert_eq!(relative[res.index(6, 4)], Vec3::zeros());
    }

    #[test]
    fn test_speed_clamps_and_slow_colliders_dilute() {
        let res = GridResolution::new(5, 5).unwrap();
        let a = sphere_at(Vec3::new(2.0, 0.0, 2.0));
        let b = sphere_at(Vec3::new(2.0, 0.0, 2.0));
        let moving = [
            MovingCollider {
                collider: &a,
                motion: RigidMotion {
                    linear: Vec3::new(0.0, 0.0, 50.0),
                    ..Default::default()
                },
            },
            MovingCollider {
                collider: &b,
                motion: RigidMotion::default(),
            },
        ];
        let mut relative = vec![Vec3::zeros(); 25];
        let p = VelocityTransferParams {
            max_speed: 10.0,
            ..params(res)
        };
        sample_velocities(&mut relative, &moving, &vec![false; 25], CellArea::full(res), &p);
        assert_relative_eq!(relative[res.index(2, 2)].z, 5.0);
    }

    #[test]
    fn test_surface_motion_is_subtracted() {
        let res = GridResolution::new(5, 5).unwrap();
        let c = sphere_at(Vec3::new(2.0, 0.0, 2.0));
        let moving = [MovingCollider {
            collider: &c,
            motion: RigidMotion {
                linear: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
        }];
        let p = VelocityTransferParams {
            surface_motion: RigidMotion {
                linear: Vec3::new(1.0, 0.0, 0.0),
                ..Default::default()
            },
            ..params(res)
        };
        let mut relative = vec![Vec3::zeros(); 25];
        sample_velocities(&mut relative, &moving, &vec![false; 25], CellArea::full(res), &p);
        assert_eq!(relative[res.index(2, 2)], Vec3::zeros());
    }

    #[test]
    fn test_vertical_velocity_moves_own_height() {
        let res = GridResolution::new(5, 5).unwrap();
        let mut heights = vec![0.0; res.ghost().sample_count()];
        let mut relative = vec![Vec3::zeros(); 25];
        relative[res.index(2, 2)] = Vec3::new(0.0, -1.0, 0.0);
        let flag = AtomicFlag::new();
        heights_from_velocities(
            &mut heights,
            &relative,
            &vec![false; 25],
            CellArea::full(res),
            res,
            0.5,
            0.3,
            0.1,
            &flag,
        );
        assert_relative_eq!(heights[res.ghost_index(2, 2)], -0.05);
        assert_eq!(heights[res.ghost_index(1, 2)], 0.0);
        assert!(flag.is_set());
    }

    #[test]
    fn test_horizontal_velocity_pushes_ahead_and_pulls_behind() {
        let res = GridResolution::new(5, 5).unwrap();
        let mut heights = vec![0.0; res.ghost().sample_count()];
        let mut relative = vec![Vec3::zeros(); 25];
        relative[res.index(2, 2)] = Vec3::new(1.0, 0.0, 0.0);
        let flag = AtomicFlag::new();
        heights_from_velocities(
            &mut heights,
            &relative,
            &vec![false; 25],
            CellArea::full(res),
            res,
            0.5,
            1.0,
            1.0,
            &flag,
        );
        // Sample ahead (+x) rises, sample behind (−x) sinks, sides stay
        assert_relative_eq!(heights[res.ghost_index(3, 2)], 1.0);
        assert_relative_eq!(heights[res.ghost_index(1, 2)], -1.0);
        assert_relative_eq!(heights[res.ghost_index(2, 3)], 0.0, epsilon = 1e-6);
        assert_relative_eq!(
            heights[res.ghost_index(3, 3)],
            std::f32::consts::FRAC_1_SQRT_2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_float_residue_leaves_surface_untouched() {
        let res = GridResolution::new(5, 5).unwrap();
        let mut heights = vec![0.0; res.ghost().sample_count()];
        let mut relative = vec![Vec3::zeros(); 25];
        relative[res.index(2, 2)] = Vec3::new(1e-8, 0.0, 0.0);
        let flag = AtomicFlag::new();
        heights_from_velocities(
            &mut heights,
            &relative,
            &vec![false; 25],
            CellArea::full(res),
            res,
            0.5,
            1.0,
            1.0,
            &flag,
        );
        assert!(heights.iter().all(|&h| h == 0.0));
        assert!(!flag.is_set());
    }
}
