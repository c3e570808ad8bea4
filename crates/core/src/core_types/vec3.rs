//! Vector and rotation aliases used throughout the engine.

use nalgebra::{UnitQuaternion, Vector2, Vector3, Vector4};

/// 3D vector for positions, velocities and directions.
///
/// Alias for `nalgebra::Vector3<f32>`. Local-space vectors use Y as the
/// surface normal axis; X and Z span the grid.
pub type Vec3 = Vector3<f32>;

/// 2D vector over the grid plane, `x` along X and `y` along Z.
pub type Vec2 = Vector2<f32>;

/// Tangent with handedness in `w`.
pub type Vec4 = Vector4<f32>;

/// Unit quaternion for orientations.
pub type Quat = UnitQuaternion<f32>;

/// Normalizes `v`, returning zero for vectors too short to normalize.
#[inline]
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    v.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
}
