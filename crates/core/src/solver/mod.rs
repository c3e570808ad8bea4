//! Data-parallel simulation kernels.
//!
//! Every kernel writes disjoint samples or bodies and is run to completion
//! before the next one starts. Values shared across workers of one kernel go
//! through [`atomics`].
//!
//! Tick order:
//! 1. [`wave`] accelerations and integration, once per substep
//! 2. [`occupancy`] raymarch, then per-body collapse into [`interaction`] blocks
//! 3. [`occupancy::apply_occupancy_effect`] or the [`velocity`] transfer
//! 4. [`gradients`]
//! 5. [`buoyancy`]

pub mod atomics;
pub mod buoyancy;
pub mod gradients;
pub mod interaction;
pub mod occupancy;
pub mod profiler;
pub mod velocity;
pub mod wave;

pub use atomics::{AtomicAccumulator, AtomicFlag, SlotCounters, ENERGY_SCALE};
pub use buoyancy::{apply_buoyant_forces, BodySnapshot, BuoyancyParams, VelocityDelta};
pub use gradients::compute_gradients;
pub use interaction::{InteractionBlocks, InteractionData};
pub use occupancy::{
    apply_occupancy_effect, collapse_per_body, merged_length, raymarch_occupancy, BodyHit,
    ColumnHit, OccupancyParams,
};
pub use profiler::{FrameTimer, ProfilerScope};
pub use velocity::{
    heights_from_velocities, sample_velocities, MovingCollider, RigidMotion,
    VelocityTransferParams,
};
pub use wave::{is_stable, WaveParams};
