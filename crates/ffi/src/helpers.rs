use std::ffi::CString;
use std::sync::MutexGuard;

use crate::error::{with_last_error_mut, DefaultWaveSimError, FfiError, WaveSimErrorCode};
use crate::instance::{InstanceState, WaveSimInstance};

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl FfiError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record `error` and return its code.
#[inline]
pub(crate) fn track_error(error: &impl FfiError) -> WaveSimErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result, clear the last error otherwise.
pub(crate) fn track_result<T>(result: Result<T, DefaultWaveSimError>) -> Result<T, WaveSimErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Run `f` and turn its outcome into an error code.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> WaveSimErrorCode
where
    F: FnOnce() -> Result<(), DefaultWaveSimError>,
{
    match track_result(f()) {
        Ok(()) => WaveSimErrorCode::Ok,
        Err(code) => code,
    }
}

pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = WaveSimErrorCode::Ok;
    });
}

/// Borrow the instance behind `ptr`.
///
/// The pointer must come from `wave_sim_new` and not be destroyed yet.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const WaveSimInstance,
) -> Result<&'a WaveSimInstance, DefaultWaveSimError> {
    // SAFETY: callers promise `ptr` is null or a live instance from `wave_sim_new`.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultWaveSimError::null_pointer("ptr"))
}

/// Lock the instance state for the duration of `f`.
pub(crate) fn with_state<F, T>(instance: &WaveSimInstance, f: F) -> Result<T, DefaultWaveSimError>
where
    F: FnOnce(&mut InstanceState) -> Result<T, DefaultWaveSimError>,
{
    let mut guard: MutexGuard<'_, InstanceState> = instance
        .state
        .lock()
        .map_err(|_| DefaultWaveSimError::lock_poisoned("Mutex"))?;
    f(&mut guard)
}
