//! Surface orchestration: configuration, interactor registry, activity
//! scheduling and the per-tick pipeline that drives the [`crate::solver`]
//! kernels.
//!
//! A [`Surface`] owns its heightfield and keeps a data request on a shared
//! [`crate::grid::FixedMask`]. The host supplies transforms and rigid bodies
//! through [`SceneHost`] on every [`Surface::tick`].

pub mod activity;
pub mod config;
pub mod motion;
pub mod registry;
pub mod render;
pub mod scene;
pub mod surface;

pub use activity::{ActivityEdge, ActivityScheduler, AwakeStatus};
pub use config::{InteractionMode, SurfaceConfig};
pub use motion::{angular_velocity_between, MotionEstimator};
pub use registry::{BodyId, InteractorDesc, InteractorId, InteractorRegistry};
pub use render::{RenderFrame, SurfaceVertex};
pub use scene::{SceneHost, SceneState};
pub use surface::{ActivityListener, Surface, TickReport};
