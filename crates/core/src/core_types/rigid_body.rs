//! Rigid-body state exchanged with the host physics engine.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use super::vec3::{Quat, Vec3};

/// Rotation axes frozen by the host, as a bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RotationLock(pub u8);

impl RotationLock {
    pub const NONE: Self = Self(0);
    pub const X: Self = Self(1);
    pub const Y: Self = Self(2);
    pub const Z: Self = Self(4);
    pub const ALL: Self = Self(7);

    #[inline]
    pub fn is_locked(self, axis: usize) -> bool {
        self.0 & (1 << axis) != 0
    }
}

impl std::ops::BitOr for RotationLock {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Snapshot of a host rigid body. Positions and velocities are world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyState {
    pub mass: f32,
    pub center_of_mass: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Principal moments of inertia
    pub inertia_tensor: Vec3,
    /// Orientation of the principal axes relative to the body
    pub inertia_tensor_rotation: Quat,
    pub rotation_lock: RotationLock,
    pub is_kinematic: bool,
}

impl Default for RigidBodyState {
    fn default() -> Self {
        Self {
            mass: 1.0,
            center_of_mass: Vec3::zeros(),
            rotation: Quat::identity(),
            linear_velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            inertia_tensor: Vec3::repeat(1.0),
            inertia_tensor_rotation: Quat::identity(),
            rotation_lock: RotationLock::NONE,
            is_kinematic: false,
        }
    }
}

impl RigidBodyState {
    /// World-space inverse inertia `R · diag(1/I) · Rᵀ`, with `R` the body
    /// rotation times the inertia rotation. Locked axes and zero moments get 0.
    pub fn inverse_inertia_world(&self) -> Matrix3<f32> {
        let inv = Vec3::from_fn(|i, _| {
            let moment = self.inertia_tensor[i];
            if self.rotation_lock.is_locked(i) || moment <= 0.0 {
                0.0
            } else {
                1.0 / moment
            }
        });
        let r = (self.rotation * self.inertia_tensor_rotation)
            .to_rotation_matrix()
            .into_inner();
        r * Matrix3::from_diagonal(&inv) * r.transpose()
    }

    /// Velocity of the body at world point `point`.
    #[inline]
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(&(point - self.center_of_mass))
    }
}
