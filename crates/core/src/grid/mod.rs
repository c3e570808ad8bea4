//! Grid storage: resolution and index mapping, heightfield buffers, interaction
//! areas and the shared fixed-cell mask.

pub mod area;
pub mod fixed_mask;
pub mod heightfield;
pub mod resolution;

pub use area::CellArea;
pub use fixed_mask::{FixedMask, MaskRequest, MaskView};
pub use heightfield::Heightfield;
pub use resolution::GridResolution;
