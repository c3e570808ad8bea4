use std::ptr;
use std::sync::Mutex;

use tracing::debug;
use wave_sim_core::{SceneState, Surface, SurfaceConfig};

use crate::error::{DefaultWaveSimError, WaveSimErrorCode};
use crate::helpers::{track_error, track_result};
use crate::types::WaveSimSettings;

/// Surface plus the scene it reads every tick.
pub(crate) struct InstanceState {
    pub(crate) surface: Surface,
    pub(crate) scene: SceneState,
}

/// A water surface owned by the host engine.
///
/// # Thread Safety
/// All state sits behind a `Mutex`, so calls may come from any thread. Calls
/// on one instance are serialized; separate instances never contend.
///
/// # Usage
/// ```cpp
/// WaveSimSettings settings = wave_sim_default_settings();
/// settings.interaction_mode = WaveSimInteractionMode::OccupancyBased;
///
/// WaveSimInstance* water = nullptr;
/// if (wave_sim_new(settings, &water) != WaveSimErrorCode::Ok) {
///     return;
/// }
///
/// // Every physics step
/// wave_sim_set_surface_transform(water, surface_transform);
/// wave_sim_set_interactor_transform(water, boat_id, boat_transform);
/// wave_sim_set_body_state(water, boat_body, &boat_state);
/// wave_sim_update(water, dt);
/// wave_sim_get_body_velocities(water, boat_body, &linear, &angular);
///
/// wave_sim_destroy(water);
/// ```
pub struct WaveSimInstance {
    pub(crate) state: Mutex<InstanceState>,
}

impl WaveSimInstance {
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the settings cannot be simulated.
    pub(crate) fn new(settings: WaveSimSettings) -> Result<Box<Self>, DefaultWaveSimError> {
        let surface = Surface::with_free_mask(SurfaceConfig::from(settings))?;
        debug!(?surface, "FFI surface created");
        Ok(Box::new(Self {
            state: Mutex::new(InstanceState {
                surface,
                scene: SceneState::default(),
            }),
        }))
    }
}

/// Settings matching the engine defaults, to be tweaked before [`wave_sim_new`].
#[no_mangle]
pub extern "C" fn wave_sim_default_settings() -> WaveSimSettings {
    WaveSimSettings::from(&SurfaceConfig::default())
}

/// Create a new water surface and return it via out-parameter.
///
/// Returns
/// - `WaveSimErrorCode::Ok` (0): success, `out_instance` contains a valid pointer
/// - `WaveSimErrorCode::NullPointer`: `out_instance` is null
/// - `WaveSimErrorCode::InvalidConfig`: size, resolution, substeps or limits are unusable
///
/// On failure `out_instance` is set to null and `wave_sim_get_last_error()`
/// describes the problem.
///
/// # Safety
///
/// - `out_instance` must be null or a valid pointer to writable memory.
/// - The caller owns the returned instance and MUST call `wave_sim_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_new(
    settings: WaveSimSettings,
    out_instance: *mut *mut WaveSimInstance,
) -> WaveSimErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultWaveSimError::null_pointer("out_instance"));
    }

    match track_result(WaveSimInstance::new(settings)) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            WaveSimErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroys an instance previously created by [`wave_sim_new`].
///
/// A null `ptr` is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `wave_sim_new` and not destroyed yet.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_destroy(ptr: *mut WaveSimInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: `ptr` came from `Box::into_raw` in `wave_sim_new` and is not
    // freed yet. Dropping the box releases the surface and its mask request.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
