use std::slice;

use crate::error::{DefaultWaveSimError, WaveSimErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_state};
use crate::instance::WaveSimInstance;

/// Advance the surface by `dt` seconds against the scene pushed so far.
///
/// Returns `InvalidConfig` for a non-positive or non-finite `dt`.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_update(ptr: *const WaveSimInstance, dt: f32) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            state.surface.tick(&mut state.scene, dt)?;
            Ok(())
        })
    })
}

/// Whether the surface is currently simulated. False for a null `ptr`.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_is_awake(ptr: *const WaveSimInstance) -> bool {
    instance_from_ptr(ptr)
        .and_then(|instance| with_state(instance, |state| Ok(state.surface.is_awake())))
        .unwrap_or(false)
}

/// Write the number of samples along X and Z.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `wave_sim_new`.
/// - `out_x` and `out_z` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_get_resolution(
    ptr: *const WaveSimInstance,
    out_x: *mut u32,
    out_z: *mut u32,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        if out_x.is_null() || out_z.is_null() {
            return Err(DefaultWaveSimError::null_pointer("out_x/out_z"));
        }
        let instance = instance_from_ptr(ptr)?;
        let resolution = with_state(instance, |state| Ok(state.surface.resolution()))?;
        unsafe {
            *out_x = resolution.x as u32;
            *out_z = resolution.z as u32;
        }
        Ok(())
    })
}

/// Copy the current heights, row-major with X varying fastest.
///
/// `capacity` is the length of `out_heights` in floats and must cover the
/// whole grid. The number of written floats goes to `out_written`.
///
/// # Safety
/// - `ptr` must be null or a live pointer returned by `wave_sim_new`.
/// - `out_heights` must be valid for `capacity` float writes.
/// - `out_written` must be null or valid for a write.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_copy_heights(
    ptr: *const WaveSimInstance,
    out_heights: *mut f32,
    capacity: usize,
    out_written: *mut usize,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        if out_heights.is_null() {
            return Err(DefaultWaveSimError::null_pointer("out_heights"));
        }
        let instance = instance_from_ptr(ptr)?;
        let heights = with_state(instance, |state| Ok(state.surface.heights()))?;
        if capacity < heights.len() {
            return Err(DefaultWaveSimError::invalid_parameter(format!(
                "capacity {capacity} is smaller than the {} samples of the surface",
                heights.len()
            )));
        }
        // SAFETY: caller guarantees `capacity` writable floats at `out_heights`.
        let out = unsafe { slice::from_raw_parts_mut(out_heights, capacity) };
        out[..heights.len()].copy_from_slice(&heights);
        if !out_written.is_null() {
            unsafe {
                *out_written = heights.len();
            }
        }
        Ok(())
    })
}

/// Offset one sample and wake the surface.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_set_height_offset(
    ptr: *const WaveSimInstance,
    index: usize,
    offset: f32,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        if !offset.is_finite() {
            return Err(DefaultWaveSimError::invalid_parameter(format!(
                "height offset must be finite, got {offset}"
            )));
        }
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            state.surface.set_height_offset(index, offset)?;
            Ok(())
        })
    })
}

/// Mark one sample as fixed or free.
///
/// # Safety
/// `ptr` must be null or a live pointer returned by `wave_sim_new`.
#[no_mangle]
pub unsafe extern "C" fn wave_sim_mask_set_fixed(
    ptr: *const WaveSimInstance,
    index: usize,
    fixed: bool,
) -> WaveSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_state(instance, |state| {
            let resolution = state.surface.resolution();
            let index = resolution.check_index(index)?;
            state.surface.mask().set_fixed(index, fixed)?;
            Ok(())
        })
    })
}
