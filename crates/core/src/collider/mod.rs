//! Analytic colliders, signed-distance queries and sphere tracing.

pub mod raymarch;
pub mod shape;

pub use raymarch::{column_occupancy, raymarch, ColumnOccupancy, RaymarchOutcome};
pub use shape::{Axis, Collider, ColliderShape, NearestPoint};
