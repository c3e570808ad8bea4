//! C-compatible mirrors of core types.
//!
//! Keep these layouts stable for C/C++/C# consumers.

use nalgebra::Quaternion;
use wave_sim_core::{
    AffineTransform, Axis, ColliderShape, GridResolution, InteractionMode, Quat, RigidBodyState,
    RotationLock, SurfaceConfig, Vec2, Vec3,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaveSimVec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<WaveSimVec3> for Vec3 {
    fn from(v: WaveSimVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for WaveSimVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// Rotation quaternion, normalized on the Rust side.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSimQuat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl From<WaveSimQuat> for Quat {
    fn from(q: WaveSimQuat) -> Self {
        let raw = Quaternion::new(q.w, q.x, q.y, q.z);
        if raw.norm_squared() <= f32::EPSILON {
            Quat::identity()
        } else {
            Quat::from_quaternion(raw)
        }
    }
}

/// Position, rotation and scale of a host object.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSimTransform {
    pub position: WaveSimVec3,
    pub rotation: WaveSimQuat,
    pub scale: WaveSimVec3,
}

impl From<WaveSimTransform> for AffineTransform {
    fn from(t: WaveSimTransform) -> Self {
        AffineTransform::new(t.position.into(), t.rotation.into(), t.scale.into())
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSimAxis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl From<WaveSimAxis> for Axis {
    fn from(axis: WaveSimAxis) -> Self {
        match axis {
            WaveSimAxis::X => Axis::X,
            WaveSimAxis::Y => Axis::Y,
            WaveSimAxis::Z => Axis::Z,
        }
    }
}

/// Collider shape of an interactor, in the interactor's local units.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveSimShape {
    Sphere { radius: f32 },
    Capsule { radius: f32, height: f32, axis: WaveSimAxis },
    Box { size: WaveSimVec3 },
}

impl WaveSimShape {
    pub(crate) fn to_core(self) -> Option<ColliderShape> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        match self {
            WaveSimShape::Sphere { radius } if positive(radius) => {
                Some(ColliderShape::Sphere { radius })
            }
            WaveSimShape::Capsule {
                radius,
                height,
                axis,
            } if positive(radius) && height.is_finite() && height >= 0.0 => {
                Some(ColliderShape::Capsule {
                    radius,
                    height,
                    axis: axis.into(),
                })
            }
            WaveSimShape::Box { size } if positive(size.x) && positive(size.y) && positive(size.z) => {
                Some(ColliderShape::Box { size: size.into() })
            }
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSimBodyState {
    pub mass: f32,
    pub center_of_mass: WaveSimVec3,
    pub rotation: WaveSimQuat,
    pub linear_velocity: WaveSimVec3,
    pub angular_velocity: WaveSimVec3,
    /// Principal moments of inertia
    pub inertia_tensor: WaveSimVec3,
    pub inertia_tensor_rotation: WaveSimQuat,
    /// Bit 0 = X, bit 1 = Y, bit 2 = Z
    pub rotation_lock: u8,
    pub is_kinematic: bool,
}

impl From<WaveSimBodyState> for RigidBodyState {
    fn from(b: WaveSimBodyState) -> Self {
        RigidBodyState {
            mass: b.mass,
            center_of_mass: b.center_of_mass.into(),
            rotation: b.rotation.into(),
            linear_velocity: b.linear_velocity.into(),
            angular_velocity: b.angular_velocity.into(),
            inertia_tensor: b.inertia_tensor.into(),
            inertia_tensor_rotation: b.inertia_tensor_rotation.into(),
            rotation_lock: RotationLock(b.rotation_lock & RotationLock::ALL.0),
            is_kinematic: b.is_kinematic,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSimInteractionMode {
    VelocityBased = 0,
    OccupancyBased = 1,
}

/// Surface settings exposed to C. Fields not listed keep their defaults.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveSimSettings {
    pub resolution_x: u32,
    pub resolution_z: u32,
    pub size_x: f32,
    pub size_z: f32,
    pub interaction_mode: WaveSimInteractionMode,
    pub substeps: u32,
    pub damping: f32,
    pub propagation_speed: f32,
    pub wave_smoothness: f32,
    pub detection_depth: f32,
    pub density: f32,
    pub max_interactors: u32,
    pub max_cells_per_interactor: u32,
    pub asleep_counter_limit: u32,
}

impl From<&SurfaceConfig> for WaveSimSettings {
    fn from(c: &SurfaceConfig) -> Self {
        Self {
            resolution_x: c.resolution.x as u32,
            resolution_z: c.resolution.z as u32,
            size_x: c.size.x,
            size_z: c.size.y,
            interaction_mode: match c.interaction_mode {
                InteractionMode::VelocityBased => WaveSimInteractionMode::VelocityBased,
                InteractionMode::OccupancyBased => WaveSimInteractionMode::OccupancyBased,
            },
            substeps: c.substeps,
            damping: c.damping,
            propagation_speed: c.propagation_speed,
            wave_smoothness: c.wave_smoothness,
            detection_depth: c.detection_depth,
            density: c.density,
            max_interactors: c.max_interactors as u32,
            max_cells_per_interactor: c.max_cells_per_interactor as u32,
            asleep_counter_limit: c.asleep_counter_limit,
        }
    }
}

impl From<WaveSimSettings> for SurfaceConfig {
    fn from(s: WaveSimSettings) -> Self {
        SurfaceConfig {
            resolution: GridResolution {
                x: s.resolution_x as usize,
                z: s.resolution_z as usize,
            },
            size: Vec2::new(s.size_x, s.size_z),
            interaction_mode: match s.interaction_mode {
                WaveSimInteractionMode::VelocityBased => InteractionMode::VelocityBased,
                WaveSimInteractionMode::OccupancyBased => InteractionMode::OccupancyBased,
            },
            substeps: s.substeps,
            damping: s.damping,
            propagation_speed: s.propagation_speed,
            wave_smoothness: s.wave_smoothness,
            detection_depth: s.detection_depth,
            density: s.density,
            max_interactors: s.max_interactors as usize,
            max_cells_per_interactor: s.max_cells_per_interactor as usize,
            asleep_counter_limit: s.asleep_counter_limit,
            ..SurfaceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip_defaults() {
        let defaults = SurfaceConfig::default();
        let settings = WaveSimSettings::from(&defaults);
        assert_eq!(SurfaceConfig::from(settings), defaults);
    }

    #[test]
    fn test_degenerate_quaternion_becomes_identity() {
        let q = WaveSimQuat {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 0.0,
        };
        assert_eq!(Quat::from(q), Quat::identity());
    }

    #[test]
    fn test_shapes_reject_non_positive_sizes() {
        assert!(WaveSimShape::Sphere { radius: 0.0 }.to_core().is_none());
        assert!(WaveSimShape::Sphere { radius: f32::NAN }.to_core().is_none());
        assert!(WaveSimShape::Capsule {
            radius: 0.5,
            height: 2.0,
            axis: WaveSimAxis::Y
        }
        .to_core()
        .is_some());
    }
}
