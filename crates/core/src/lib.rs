//! Real-time heightfield water simulation.
//!
//! A regular grid of heights is evolved by a damped wave equation and coupled
//! to rigid bodies through one of two interaction models:
//!
//! - **Velocity based**: colliders push the water with their relative
//!   velocity. Cheap and one-way.
//! - **Occupancy based**: colliders displace the water by the volume they
//!   fill below the surface, and receive buoyant forces in return.
//!
//! Quiescent surfaces fall asleep and skip the solver until something touches
//! them again.
//!
//! ## Layout
//!
//! - [`core_types`]: vectors, transforms, bounds, rigid-body state
//! - [`grid`]: resolution, heightfield storage, fixed mask, cell areas
//! - [`collider`]: analytic colliders and the raymarcher
//! - [`solver`]: data-parallel kernels run by a tick
//! - [`simulation`]: [`Surface`], configuration, registry and scheduling

pub mod collider;
pub mod core_types;
pub mod error;
pub mod grid;
pub mod simulation;
pub mod solver;

pub use collider::{Axis, Collider, ColliderShape};
pub use core_types::{Aabb, AffineTransform, Quat, RigidBodyState, RotationLock, Vec2, Vec3};
pub use error::{Result, WaveSimError};
pub use grid::{FixedMask, GridResolution, Heightfield, MaskRequest};
pub use simulation::{
    ActivityEdge, AwakeStatus, BodyId, InteractionMode, InteractorDesc, InteractorId,
    RenderFrame, SceneHost, SceneState, Surface, SurfaceConfig, SurfaceVertex, TickReport,
};
