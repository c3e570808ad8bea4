//! Error type shared by every fallible operation of the engine.
//!
//! Configuration limits (too many interactors, too many hit cells) are the
//! exception: they degrade by truncation and are reported through `tracing`
//! warnings rather than failing the tick.

use thiserror::Error;

/// Errors returned by surface, mask and registry operations.
#[derive(Debug, Error)]
pub enum WaveSimError {
    /// Surface size, cell size or resolution is not positive.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A sample coordinate or flat index lies outside the grid.
    #[error("sample ({x}, {z}) is outside a {width}x{depth} grid")]
    SampleOutOfRange {
        x: i64,
        z: i64,
        width: usize,
        depth: usize,
    },

    /// A configuration value that cannot be clamped into a usable range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The fixed mask was mutated without an outstanding data request.
    #[error("fixed mask mutated without an outstanding request")]
    MaskNotRequested,

    /// The fixed mask was resized while requests were outstanding.
    #[error("fixed mask cannot be resized while {requests} request(s) are outstanding")]
    MaskInUse { requests: usize },

    /// The surface and its fixed mask disagree on resolution.
    #[error("resolution mismatch: surface expects {expected:?}, mask has {actual:?}")]
    ResolutionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The interactor cap of the surface is already reached.
    #[error("interactor limit of {limit} reached")]
    InteractorLimit { limit: usize },

    /// No interactor is registered under this id.
    #[error("unknown interactor {0}")]
    UnknownInteractor(u64),

    /// The sample is marked fixed and cannot be modified.
    #[error("sample {0} is fixed")]
    FixedSample(usize),

    /// Image import or export failed.
    #[error("mask image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WaveSimError>;
