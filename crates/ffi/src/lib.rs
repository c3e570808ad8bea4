//! C ABI over `wave-sim-core`.
//!
//! A host engine creates a [`WaveSimInstance`] with [`wave_sim_new`], pushes
//! transforms and rigid-body states every frame, calls [`wave_sim_update`]
//! and reads back heights and body velocities. Every fallible call returns a
//! [`WaveSimErrorCode`]; details are available through
//! [`wave_sim_get_last_error`].

mod error;
mod helpers;
mod instance;
mod interactors;
mod simulation;
mod types;

pub use error::{wave_sim_get_last_error, wave_sim_get_last_error_code, WaveSimErrorCode};
pub use instance::{wave_sim_default_settings, wave_sim_destroy, wave_sim_new, WaveSimInstance};
pub use interactors::{
    wave_sim_add_interactor, wave_sim_get_body_velocities, wave_sim_remove_interactor,
    wave_sim_set_body_state, wave_sim_set_interactor_transform, wave_sim_set_surface_transform,
};
pub use simulation::{
    wave_sim_copy_heights, wave_sim_get_resolution, wave_sim_is_awake, wave_sim_mask_set_fixed,
    wave_sim_set_height_offset, wave_sim_update,
};
pub use types::{
    WaveSimAxis, WaveSimBodyState, WaveSimInteractionMode, WaveSimQuat, WaveSimSettings,
    WaveSimShape, WaveSimTransform, WaveSimVec3,
};
