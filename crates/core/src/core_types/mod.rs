//! Geometric primitives and host-facing value types shared by the solver,
//! colliders and surface.

pub mod aabb;
pub mod rigid_body;
pub mod transform;
pub mod vec3;

pub use aabb::Aabb;
pub use rigid_body::{RigidBodyState, RotationLock};
pub use transform::AffineTransform;
pub use vec3::{normalize_or_zero, Quat, Vec2, Vec3, Vec4};
