//! Buoyant forces from per-body occupancy hits.
//!
//! ```text
//! F  = density · V · |g| · dir
//! Δv = F / m · Δt
//! Δω = I⁻¹ · ((p − com) × F) · Δt
//! ```
//!
//! All hits of a body are evaluated against the velocities the body had at
//! the start of the tick, so their contributions simply add up.

use nalgebra::Matrix3;
use rayon::prelude::*;

use crate::core_types::{AffineTransform, RigidBodyState, Vec2, Vec3};
use crate::grid::GridResolution;

use super::interaction::{InteractionBlocks, InteractionData};

/// Immersed volumes below this are ignored.
pub const MIN_VOLUME: f32 = 0.0001;

/// A rigid body as seen by the buoyancy kernel.
#[derive(Debug, Clone, Copy)]
pub struct BodySnapshot {
    pub state: RigidBodyState,
    pub inverse_inertia: Matrix3<f32>,
}

impl BodySnapshot {
    pub fn new(state: RigidBodyState) -> Self {
        Self {
            inverse_inertia: state.inverse_inertia_world(),
            state,
        }
    }
}

/// Velocity change accumulated for one body during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VelocityDelta {
    pub linear: Vec3,
    pub angular: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct BuoyancyParams {
    pub surface: AffineTransform,
    pub resolution: GridResolution,
    pub sample_size: Vec2,
    pub detection_depth: f32,
    pub density: f32,
    pub gravity: f32,
    pub damping: f32,
    /// Tilt the force along the local surface slope
    pub horizontal: bool,
    pub dt: f32,
}

/// Force of a single hit and the world point it acts on.
pub fn hit_force(
    hit: &InteractionData,
    body: &RigidBodyState,
    gradients: &[Vec3],
    params: &BuoyancyParams,
) -> Option<(Vec3, Vec3)> {
    let cell = usize::try_from(hit.cell_index).ok()?;
    let scale = params.surface.scale.abs();
    let volume = hit.occupancy
        * scale.y
        * params.sample_size.x
        * scale.x
        * params.sample_size.y
        * scale.z;
    if volume < MIN_VOLUME {
        return None;
    }

    let up = params.surface.up();
    let mut direction = up;
    if params.horizontal {
        let g = gradients[cell];
        direction = (direction + params.surface.transform_direction(Vec3::new(g.x, 0.0, g.z)))
            .normalize();
    }

    let (x, z) = params.resolution.coords(cell);
    let point = params.surface.transform_point(Vec3::new(
        x as f32 * params.sample_size.x,
        hit.distance - params.detection_depth,
        z as f32 * params.sample_size.y,
    ));

    let mut force = direction * (params.density * volume * params.gravity);
    if params.damping > 0.0 {
        let vertical_speed = body.velocity_at(point).dot(&up);
        force -= up * (vertical_speed * params.damping);
    }
    Some((force, point))
}

/// Velocity change of every body slot from the hits collected this tick.
///
/// Kinematic and massless bodies get a zero delta.
pub fn apply_buoyant_forces(
    bodies: &[BodySnapshot],
    blocks: &InteractionBlocks,
    gradients: &[Vec3],
    params: &BuoyancyParams,
) -> Vec<VelocityDelta> {
    bodies
        .par_iter()
        .enumerate()
        .map(|(slot, body)| {
            let state = &body.state;
            let mut delta = VelocityDelta::default();
            if state.is_kinematic || state.mass <= 0.0 || slot >= blocks.block_count() {
                return delta;
            }
            for hit in blocks.hits(slot) {
                let Some((force, point)) = hit_force(&hit, state, gradients, params) else {
                    continue;
                };
                delta.linear += force / state.mass * params.dt;
                let torque = (point - state.center_of_mass).cross(&force);
                delta.angular += body.inverse_inertia * torque * params.dt;
            }
            delta
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> BuoyancyParams {
        BuoyancyParams {
            surface: AffineTransform::identity(),
            resolution: GridResolution::new(11, 11).unwrap(),
            sample_size: Vec2::new(1.0, 1.0),
            detection_depth: 5.0,
            density: 1.0,
            gravity: 9.81,
            damping: 0.0,
            horizontal: false,
            dt: 0.1,
        }
    }

    fn blocks_with(cell: i32, occupancy: f32, distance: f32) -> InteractionBlocks {
        let blocks = InteractionBlocks::new(1, 4);
        blocks.reset();
        blocks.add_hit(
            0,
            InteractionData {
                cell_index: cell,
                occupancy,
                distance,
            },
        );
        blocks.finish();
        blocks
    }

    #[test]
    fn test_centered_hit_lifts_without_torque() {
        let p = params();
        let cell = p.resolution.index(5, 5) as i32;
        let body = BodySnapshot::new(RigidBodyState {
            mass: 2.0,
            center_of_mass: Vec3::new(5.0, -1.0, 5.0),
            ..Default::default()
        });
        let blocks = blocks_with(cell, 2.0, 3.0);
        let gradients = vec![Vec3::zeros(); 121];
        let deltas = apply_buoyant_forces(&[body], &blocks, &gradients, &p);
        // F = 1 · 2 · 9.81, Δv = F / 2 · 0.1
        assert_relative_eq!(deltas[0].linear.y, 0.981, epsilon = 1e-5);
        assert_relative_eq!(deltas[0].linear.x, 0.0);
        assert_relative_eq!(deltas[0].angular.norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_offset_hit_produces_torque() {
        let p = params();
        let cell = p.resolution.index(6, 5) as i32;
        let body = BodySnapshot::new(RigidBodyState {
            center_of_mass: Vec3::new(5.0, -2.0, 5.0),
            ..Default::default()
        });
        let blocks = blocks_with(cell, 1.0, 3.0);
        let gradients = vec![Vec3::zeros(); 121];
        let deltas = apply_buoyant_forces(&[body], &blocks, &gradients, &p);
        // r = (1, 0, 0), F up: torque about +z
        assert!(deltas[0].angular.z > 0.0);
    }

    #[test]
    fn test_kinematic_body_is_untouched() {
        let p = params();
        let body = BodySnapshot::new(RigidBodyState {
            is_kinematic: true,
            ..Default::default()
        });
        let blocks = blocks_with(3, 1.0, 1.0);
        let deltas = apply_buoyant_forces(&[body], &blocks, &vec![Vec3::zeros(); 121], &p);
        assert_eq!(deltas[0], VelocityDelta::default());
    }

    #[test]
    fn test_damping_opposes_vertical_motion() {
        let p = BuoyancyParams {
            damping: 1.0,
            ..params()
        };
        let state = RigidBodyState {
            linear_velocity: Vec3::new(0.0, 100.0, 0.0),
            center_of_mass: Vec3::new(5.0, -2.0, 5.0),
            ..Default::default()
        };
        let hit = InteractionData {
            cell_index: p.resolution.index(5, 5) as i32,
            occupancy: 1.0,
            distance: 3.0,
        };
        let (force, _) = hit_force(&hit, &state, &[Vec3::zeros(); 121], &p).unwrap();
        assert_relative_eq!(force.y, 9.81 - 100.0, epsilon = 1e-4);
    }

    #[test]
    fn test_horizontal_buoyancy_follows_slope() {
        let p = BuoyancyParams {
            horizontal: true,
            ..params()
        };
        let cell = p.resolution.index(5, 5);
        let mut gradients = vec![Vec3::zeros(); 121];
        gradients[cell] = Vec3::new(0.5, 0.5, 0.0);
        let hit = InteractionData {
            cell_index: cell as i32,
            occupancy: 1.0,
            distance: 3.0,
        };
        let (force, _) = hit_force(&hit, &RigidBodyState::default(), &gradients, &p).unwrap();
        assert!(force.x > 0.0);
        assert_relative_eq!(force.norm(), 9.81, epsilon = 1e-4);
    }

    #[test]
    fn test_tiny_volume_is_skipped() {
        let p = params();
        let hit = InteractionData {
            cell_index: 0,
            occupancy: 0.00001,
            distance: 0.0,
        };
        assert!(hit_force(&hit, &RigidBodyState::default(), &[Vec3::zeros(); 121], &p).is_none());
    }
}
