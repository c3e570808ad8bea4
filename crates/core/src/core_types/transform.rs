//! Affine transforms (translation, rotation, non-uniform scale).
//!
//! Scale is applied first, then rotation, then translation, matching a
//! `T * R * S` matrix. The `*_unscaled` variants skip the scale term and are
//! used by colliders, which fold scale into their own parameters.

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use super::vec3::{Quat, Vec3};

/// Local-to-world transform of a surface or a collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vec3::repeat(1.0),
        }
    }

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// World up direction of the local Y axis.
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point.component_mul(&self.scale) + self.translation
    }

    pub fn transform_point_unscaled(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Returns the local point for a world point. Zero scale axes map to zero.
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        let unrotated = self.rotation.inverse() * (point - self.translation);
        unrotated.component_mul(&inverse_scale(self.scale))
    }

    pub fn inverse_transform_point_unscaled(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.translation)
    }

    /// Rotates a direction, ignoring scale and translation.
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.rotation * direction
    }

    pub fn inverse_transform_direction(&self, direction: Vec3) -> Vec3 {
        self.rotation.inverse() * direction
    }

    /// Scales then rotates a vector, ignoring translation.
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector.component_mul(&self.scale)
    }

    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        (self.rotation.inverse() * vector).component_mul(&inverse_scale(self.scale))
    }

    /// Largest absolute scale component.
    pub fn max_scale(&self) -> f32 {
        self.scale.abs().max()
    }
}

fn inverse_scale(scale: Vec3) -> Vec3 {
    scale.map(|s| if s.abs() > f32::EPSILON { 1.0 / s } else { 0.0 })
}
