//! Shared setup for integration tests.

#![allow(dead_code)]

use wave_sim_core::{GridResolution, InteractionMode, SurfaceConfig, Vec2};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Square surface with unit sample spacing.
pub fn unit_spacing_config(samples: usize, mode: InteractionMode) -> SurfaceConfig {
    let extent = (samples - 1) as f32;
    SurfaceConfig {
        resolution: GridResolution { x: samples, z: samples },
        size: Vec2::new(extent, extent),
        interaction_mode: mode,
        ..Default::default()
    }
}
