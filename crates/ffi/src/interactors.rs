use wave_sim_core::{AffineTransform, BodyId, InteractorDesc, InteractorId, Vec3};

use crate::error::{DefaultWaveSimError, WaveSimErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_state};
use crate::instance::WaveSimInstance;
use crate::types::{WaveSimBodyState, WaveSimShape, WaveSimTransform, WaveSimVec3};

/// Register an interactor.
///
/// # Parameters
/// - `interactor_id`: Host handle of the collider
/// - `shape`: Collider shape in local units
/// - `center`: Shape offset from the transform origin
/// - `body_id`: Host handle of the driving rigid body, or -1 for none
/// - `transform`: Current world transform
///
/// Registering the same id twice is a no-op. Returns `InteractorLimit` when
/// the surface is full.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_add_interactor(
    ptr: *const WaveSimInstance,
    interactor_id: u64,
    shape: WaveSimShape,
    center: WaveSimVec3,
    body_id: i64,
    transform: WaveSimTransform,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        let shape = shape.to_core().ok_or_else(|| {
            DefaultWaveSimError::invalid_parameter(format!("invalid collider shape {shape:?}"))
        })?;
        let instance = instance_from_ptr(ptr)?;
        let id = InteractorId(interactor_id);
        let mut desc = InteractorDesc::new(id, shape);
        desc.center = center.into();
        if let Ok(body) = u64::try_from(body_id) {
            desc = desc.with_body(BodyId(body));
        }
        let transform = AffineTransform::from(transform);
        with_state(instance, |state| {
            state.surface.add_interactor(desc, transform)?;
            state.scene.set_interactor_transform(id, transform);
            Ok(())
        })
    })
}

/// Unregister an interactor.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_remove_interactor(
    ptr: *const WaveSimInstance,
    interactor_id: u64,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            let id = InteractorId(interactor_id);
            state.surface.remove_interactor(id)?;
            state.scene.interactors.remove(&id);
            Ok(())
        })
    })
}

/// Set the world transform of the surface for the next update.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_set_surface_transform(
    ptr: *const WaveSimInstance,
    transform: WaveSimTransform,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            state.scene.surface = transform.into();
            Ok(())
        })
    })
}

/// Set the world transform of an interactor for the next update.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_set_interactor_transform(
    ptr: *const WaveSimInstance,
    interactor_id: u64,
    transform: WaveSimTransform,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            let id = InteractorId(interactor_id);
            if !state.surface.registry().contains(id) {
                return Err(DefaultWaveSimError::from(
                    wave_sim_core::WaveSimError::UnknownInteractor(interactor_id),
                ));
            }
            state.scene.set_interactor_transform(id, transform.into());
            Ok(())
        })
    })
}

/// Store the current state of a host rigid body.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `wave_sim_new`.
/// - `body` must be null or point to a readable `WaveSimBodyState`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_set_body_state(
    ptr: *const WaveSimInstance,
    body_id: u64,
    body: *const WaveSimBodyState,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        // SAFETY: caller guarantees `body` is null or readable.
        let body = unsafe { body.as_ref() }.ok_or_else(|| DefaultWaveSimError::null_pointer("body"))?;
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            state.scene.set_body(BodyId(body_id), (*body).into());
            Ok(())
        })
    })
}

/// Read back body velocities after an update applied buoyancy.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `wave_sim_new`.
/// - `out_linear` and `out_angular` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_get_body_velocities(
    ptr: *const WaveSimInstance,
    body_id: u64,
    out_linear: *mut WaveSimVec3,
    out_angular: *mut WaveSimVec3,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        if out_linear.is_null() || out_angular.is_null() {
            return Err(DefaultWaveSimError::null_pointer("out_linear/out_angular"));
        }
        let instance = instance_from_ptr(ptr)?;
        let (linear, angular): (Vec3, Vec3) = with_state(instance, |state| {
            state
                .scene
                .body(BodyId(body_id))
                .map(|b| (b.linear_velocity, b.angular_velocity))
                .ok_or_else(|| {
                    DefaultWaveSimError::invalid_parameter(format!("unknown body {body_id}"))
                })
        })?;
        unsafe {
            *out_linear = linear.into();
            *out_angular = angular.into();
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{wave_sim_default_settings, wave_sim_destroy, wave_sim_new};
    use crate::simulation::{wave_sim_copy_heights, wave_sim_update};
    use crate::types::{WaveSimInteractionMode, WaveSimQuat};
    use std::ptr;

    fn transform_at(x: f32, y: f32, z: f32) -> WaveSimTransform {
        WaveSimTransform {
            position: WaveSimVec3 { x, y, z },
            rotation: WaveSimQuat {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                w: 1.0,
            },
            scale: WaveSimVec3 {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
        }
    }

    #[test]
    fn test_floating_body_round_trip() {
        let mut settings = wave_sim_default_settings();
        settings.resolution_x = 11;
        settings.resolution_z = 11;
        settings.interaction_mode = WaveSimInteractionMode::OccupancyBased;

        let mut water = ptr::null_mut();
        unsafe {
            assert_eq!(wave_sim_new(settings, &mut water), WaveSimErrorCode::Ok);
            let com = WaveSimVec3 {
                x: 5.0,
                y: 0.0,
                z: 5.0,
            };
            let code = wave_sim_add_interactor(
                water,
                1,
                WaveSimShape::Sphere { radius: 1.0 },
                WaveSimVec3::default(),
                3,
                transform_at(5.0, 0.0, 5.0),
            );
            assert_eq!(code, WaveSimErrorCode::Ok);

            let body = WaveSimBodyState {
                mass: 1.0,
                center_of_mass: com,
                rotation: transform_at(0.0, 0.0, 0.0).rotation,
                linear_velocity: WaveSimVec3::default(),
                angular_velocity: WaveSimVec3::default(),
                inertia_tensor: WaveSimVec3 {
                    x: 1.0,
                    y: 1.0,
                    z: 1.0,
                },
                inertia_tensor_rotation: transform_at(0.0, 0.0, 0.0).rotation,
                rotation_lock: 0,
                is_kinematic: false,
            };
            assert_eq!(wave_sim_set_body_state(water, 3, &body), WaveSimErrorCode::Ok);
            assert_eq!(wave_sim_update(water, 0.02), WaveSimErrorCode::Ok);

            let mut linear = WaveSimVec3::default();
            let mut angular = WaveSimVec3::default();
            assert_eq!(
                wave_sim_get_body_velocities(water, 3, &mut linear, &mut angular),
                WaveSimErrorCode::Ok
            );
            assert!(linear.y > 0.0);

            let mut heights = vec![0.0; 121];
            let mut written = 0;
            assert_eq!(
                wave_sim_copy_heights(water, heights.as_mut_ptr(), heights.len(), &mut written),
                WaveSimErrorCode::Ok
            );
            assert_eq!(written, 121);
            assert!(heights.iter().any(|&h| h > 0.0));

            assert_eq!(
                wave_sim_remove_interactor(water, 9),
                WaveSimErrorCode::UnknownInteractor
            );
            wave_sim_destroy(water);
        }
    }

    #[test]
    fn test_null_instance_is_reported() {
        let code = unsafe { wave_sim_update(ptr::null(), 0.02) };
        assert_eq!(code, WaveSimErrorCode::NullPointer);
        assert_eq!(
            crate::error::wave_sim_get_last_error_code(),
            WaveSimErrorCode::NullPointer
        );
        assert!(!crate::error::wave_sim_get_last_error().is_null());
    }

    #[test]
    fn test_invalid_settings_leave_null_instance() {
        let mut settings = wave_sim_default_settings();
        settings.substeps = 0;
        let mut water = ptr::null_mut();
        let code = unsafe { wave_sim_new(settings, &mut water) };
        assert_eq!(code, WaveSimErrorCode::InvalidConfig);
        assert!(water.is_null());
    }
}
