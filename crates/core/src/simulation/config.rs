//! Surface configuration.
//!
//! Every field has a default, so partial configuration files deserialize.
//! [`SurfaceConfig::validate`] rejects values that cannot be simulated and
//! clamps values that are merely out of their recommended range.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core_types::{Vec2, Vec3};
use crate::error::{Result, WaveSimError};
use crate::grid::GridResolution;

/// How interactors affect the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InteractionMode {
    /// One-way push from collider velocities. Cheaper, no forces on bodies.
    #[default]
    VelocityBased,
    /// Displacement from collider volume, with buoyancy on rigid bodies.
    OccupancyBased,
}

/// Tunable parameters of a water surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Samples along X and Z
    pub resolution: GridResolution,
    /// Surface extent along local X and Z
    pub size: Vec2,
    /// Run the wave solver at all
    pub simulate: bool,
    pub substeps: u32,
    pub damping: f32,
    pub propagation_speed: f32,
    /// [0, 1]
    pub wave_smoothness: f32,
    /// [0, 2]
    pub speed_tweak: f32,
    pub interaction_mode: InteractionMode,

    // Velocity-based interaction
    pub vertical_push_scale: f32,
    pub horizontal_push_scale: f32,
    pub interactor_max_speed: f32,
    pub interactor_min_speed: f32,
    /// Trigger volume extent above the rest surface
    pub upwards_detection_distance: f32,
    /// Trigger volume extent below the rest surface
    pub downwards_detection_distance: f32,

    // Occupancy-based interaction
    pub affect_surface: bool,
    pub buoyancy: bool,
    pub horizontal_buoyancy: bool,
    pub detection_depth: f32,
    pub density: f32,
    pub buoyancy_damping: f32,
    pub effect_scale: f32,
    pub gravity: Vec3,

    // Limits
    pub max_cells_per_interactor: usize,
    pub max_interactors: usize,

    // Activity
    /// Quiet ticks before the surface falls asleep
    pub asleep_counter_limit: u32,
    /// Kinetic energy `Σ½v²` at or below which a tick counts as quiet
    pub kinetic_energy_threshold: f32,

    /// Log configuration-limit warnings
    pub show_setting_warnings: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            resolution: GridResolution::default(),
            size: Vec2::new(10.0, 10.0),
            simulate: true,
            substeps: 1,
            damping: 2.0,
            propagation_speed: 6.0,
            wave_smoothness: 0.0,
            speed_tweak: 1.0,
            interaction_mode: InteractionMode::default(),
            vertical_push_scale: 0.5,
            horizontal_push_scale: 0.3,
            interactor_max_speed: 100.0,
            interactor_min_speed: 0.001,
            upwards_detection_distance: 0.5,
            downwards_detection_distance: 0.5,
            affect_surface: true,
            buoyancy: true,
            horizontal_buoyancy: true,
            detection_depth: 5.0,
            density: 1.0,
            buoyancy_damping: 0.05,
            effect_scale: 1.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_cells_per_interactor: 100,
            max_interactors: 1,
            asleep_counter_limit: 50,
            kinetic_energy_threshold: 0.001,
            show_setting_warnings: true,
        }
    }
}

fn clamp_warn(name: &str, value: &mut f32, min: f32, max: f32) {
    let clamped = value.clamp(min, max);
    if clamped != *value {
        warn!(setting = name, value = *value, clamped, "Setting out of range, clamped");
        *value = clamped;
    }
}

impl SurfaceConfig {
    /// Checks hard constraints and clamps soft ranges in place.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::InvalidGeometry`] for a non-positive size or resolution,
    /// [`WaveSimError::InvalidConfig`] for zero substeps, zero limits or
    /// non-finite values.
    pub fn validate(&mut self) -> Result<()> {
        self.resolution = GridResolution::new(self.resolution.x, self.resolution.z)?;
        if !(self.size.x > 0.0 && self.size.y > 0.0) || !self.size.iter().all(|v| v.is_finite()) {
            return Err(WaveSimError::InvalidGeometry(format!(
                "surface size must be positive, got {}x{}",
                self.size.x, self.size.y
            )));
        }
        if self.substeps == 0 {
            return Err(WaveSimError::InvalidConfig("substeps must be at least 1".into()));
        }
        if self.max_interactors == 0 || self.max_cells_per_interactor == 0 {
            return Err(WaveSimError::InvalidConfig(
                "interactor and cell limits must be at least 1".into(),
            ));
        }
        let scalars = [
            self.damping,
            self.propagation_speed,
            self.wave_smoothness,
            self.speed_tweak,
            self.vertical_push_scale,
            self.horizontal_push_scale,
            self.interactor_max_speed,
            self.interactor_min_speed,
            self.detection_depth,
            self.density,
            self.buoyancy_damping,
            self.effect_scale,
            self.kinetic_energy_threshold,
        ];
        if !scalars.iter().all(|v| v.is_finite()) || !self.gravity.iter().all(|v| v.is_finite()) {
            return Err(WaveSimError::InvalidConfig("non-finite setting".into()));
        }

        clamp_warn("damping", &mut self.damping, 0.0, f32::MAX);
        clamp_warn("propagation_speed", &mut self.propagation_speed, 0.0, f32::MAX);
        clamp_warn("wave_smoothness", &mut self.wave_smoothness, 0.0, 1.0);
        clamp_warn("speed_tweak", &mut self.speed_tweak, 0.0, 2.0);
        clamp_warn("interactor_min_speed", &mut self.interactor_min_speed, 0.0, f32::MAX);
        clamp_warn(
            "interactor_max_speed",
            &mut self.interactor_max_speed,
            self.interactor_min_speed,
            f32::MAX,
        );
        clamp_warn("detection_depth", &mut self.detection_depth, 0.0, f32::MAX);
        clamp_warn("density", &mut self.density, 0.0, f32::MAX);
        clamp_warn("buoyancy_damping", &mut self.buoyancy_damping, 0.0, f32::MAX);
        clamp_warn(
            "kinetic_energy_threshold",
            &mut self.kinetic_energy_threshold,
            0.0,
            f32::MAX,
        );
        Ok(())
    }

    /// Whether switching from `self` to `other` needs buffers to be rebuilt.
    pub fn is_structural_change(&self, other: &Self) -> bool {
        self.resolution != other.resolution
            || self.size != other.size
            || self.interaction_mode != other.interaction_mode
            || self.max_interactors != other.max_interactors
            || self.max_cells_per_interactor != other.max_cells_per_interactor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let mut config = SurfaceConfig::default();
        config.validate().unwrap();
        assert_eq!(config, SurfaceConfig::default());
    }

    #[test]
    fn test_soft_ranges_are_clamped() {
        let mut config = SurfaceConfig {
            wave_smoothness: 1.5,
            speed_tweak: -1.0,
            propagation_speed: -3.0,
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.wave_smoothness, 1.0);
        assert_eq!(config.speed_tweak, 0.0);
        assert_eq!(config.propagation_speed, 0.0);
    }

    #[test]
    fn test_hard_errors() {
        let mut zero_substeps = SurfaceConfig {
            substeps: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_substeps.validate(),
            Err(WaveSimError::InvalidConfig(_))
        ));

        let mut flat = SurfaceConfig {
            size: Vec2::new(0.0, 4.0),
            ..Default::default()
        };
        assert!(matches!(flat.validate(), Err(WaveSimError::InvalidGeometry(_))));

        let mut nan = SurfaceConfig {
            damping: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_structural_change_detection() {
        let base = SurfaceConfig::default();
        let tweak = SurfaceConfig {
            damping: 0.5,
            ..base.clone()
        };
        assert!(!base.is_structural_change(&tweak));
        let mode = SurfaceConfig {
            interaction_mode: InteractionMode::OccupancyBased,
            ..base.clone()
        };
        assert!(base.is_structural_change(&mode));
    }
}
