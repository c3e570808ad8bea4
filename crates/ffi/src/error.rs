use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use wave_sim_core::WaveSimError;

/// Common interface for errors crossing the FFI boundary.
///
/// - `code()` - Error code handed to the caller
/// - `msg()` - Human-readable description kept for [`wave_sim_get_last_error`]
pub(crate) trait FfiError {
    fn code(&self) -> WaveSimErrorCode;

    fn msg(&self) -> &str;
}

/// Error code plus message, built from argument checks or core errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultWaveSimError {
    code: WaveSimErrorCode,
    msg: String,
}

impl DefaultWaveSimError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: WaveSimErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: WaveSimErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for an argument the core never sees.
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: WaveSimErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl From<WaveSimError> for DefaultWaveSimError {
    fn from(error: WaveSimError) -> Self {
        let code = match &error {
            WaveSimError::InvalidGeometry(_) | WaveSimError::InvalidConfig(_) => {
                WaveSimErrorCode::InvalidConfig
            }
            WaveSimError::SampleOutOfRange { .. } => WaveSimErrorCode::SampleOutOfRange,
            WaveSimError::InteractorLimit { .. } => WaveSimErrorCode::InteractorLimit,
            WaveSimError::UnknownInteractor(_) => WaveSimErrorCode::UnknownInteractor,
            WaveSimError::FixedSample(_) => WaveSimErrorCode::FixedSample,
            WaveSimError::MaskNotRequested
            | WaveSimError::MaskInUse { .. }
            | WaveSimError::ResolutionMismatch { .. }
            | WaveSimError::Image(_) => WaveSimErrorCode::MaskError,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl FfiError for DefaultWaveSimError {
    fn code(&self) -> WaveSimErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by water surface functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveSimErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: a panic happened while another thread held the instance.
    LockPoisoned = 2,

    /// Argument rejected before reaching the simulation.
    InvalidParameter = 3,

    /// Settings cannot be simulated (size, resolution, substeps, limits).
    InvalidConfig = 4,

    /// Sample index outside the grid.
    SampleOutOfRange = 5,

    /// The interactor cap is reached.
    InteractorLimit = 6,

    /// No interactor with this id.
    UnknownInteractor = 7,

    /// The sample is fixed and cannot be modified.
    FixedSample = 8,

    /// Fixed mask misuse.
    MaskError = 9,
}

impl From<DefaultWaveSimError> for WaveSimErrorCode {
    fn from(error: DefaultWaveSimError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error of this thread (C string, error code).
    /// The CString is kept here so the pointer handed out stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, WaveSimErrorCode)> = const { RefCell::new((None, WaveSimErrorCode::Ok)) };
}

pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, WaveSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, WaveSimErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns null when the last call on this thread succeeded.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// WaveSimInstance* water = nullptr;
/// WaveSimSettings settings = wave_sim_default_settings();
/// if (wave_sim_new(settings, &water) != WaveSimErrorCode::Ok) {
///     printf("Water creation failed: %s\n", wave_sim_get_last_error());
/// }
/// ```
#[no_mangle]
pub extern "C" fn wave_sim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code of this thread.
#[no_mangle]
pub extern "C" fn wave_sim_get_last_error_code() -> WaveSimErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
