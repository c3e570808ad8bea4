mod common;

use wave_sim_core::{InteractionMode, Surface, SurfaceConfig, WaveSimError};

#[test]
fn test_partial_config_fills_defaults() {
    let json = r#"{
        "resolution": { "x": 16, "z": 12 },
        "size": [8.0, 6.0],
        "interaction_mode": "OccupancyBased",
        "density": 0.8
    }"#;
    let config: SurfaceConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.interaction_mode, InteractionMode::OccupancyBased);
    assert_eq!(config.size.x, 8.0);
    assert_eq!(config.density, 0.8);
    assert_eq!(config.substeps, SurfaceConfig::default().substeps);

    let surface = Surface::with_free_mask(config).unwrap();
    assert_eq!(surface.resolution().x, 16);
    assert_eq!(surface.resolution().z, 12);
}

#[test]
fn test_out_of_range_values_are_clamped() {
    let json = r#"{ "resolution": { "x": 1000, "z": 2 }, "wave_smoothness": 3.0 }"#;
    let config: SurfaceConfig = serde_json::from_str(json).unwrap();
    let surface = Surface::with_free_mask(config).unwrap();
    assert_eq!(surface.resolution().x, 256);
    assert_eq!(surface.resolution().z, 3);
    assert_eq!(surface.config().wave_smoothness, 1.0);
}

#[test]
fn test_unusable_values_are_errors() {
    let config: SurfaceConfig = serde_json::from_str(r#"{ "substeps": 0 }"#).unwrap();
    assert!(matches!(
        Surface::with_free_mask(config),
        Err(WaveSimError::InvalidConfig(_))
    ));

    let config: SurfaceConfig = serde_json::from_str(r#"{ "size": [0.0, 4.0] }"#).unwrap();
    assert!(matches!(
        Surface::with_free_mask(config),
        Err(WaveSimError::InvalidGeometry(_))
    ));
}

#[test]
fn test_config_survives_serialization() {
    let config = SurfaceConfig {
        damping: 0.5,
        interaction_mode: InteractionMode::OccupancyBased,
        ..Default::default()
    };
    let text = serde_json::to_string(&config).unwrap();
    let back: SurfaceConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}
