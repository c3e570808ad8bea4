//! A simulated water surface and its per-tick pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collider::Collider;
use crate::core_types::{Aabb, AffineTransform, RigidBodyState, Vec3};
use crate::error::{Result, WaveSimError};
use crate::grid::{CellArea, FixedMask, GridResolution, Heightfield, MaskRequest};
use crate::solver::{
    apply_buoyant_forces, apply_occupancy_effect, compute_gradients, heights_from_velocities,
    is_stable, raymarch_occupancy, sample_velocities, wave, AtomicAccumulator, AtomicFlag,
    BodySnapshot, BuoyancyParams, FrameTimer, InteractionBlocks, MovingCollider, OccupancyParams,
    ProfilerScope, VelocityTransferParams, WaveParams,
};

use super::activity::{ActivityEdge, ActivityScheduler, AwakeStatus};
use super::config::{InteractionMode, SurfaceConfig};
use super::motion::MotionEstimator;
use super::registry::{InteractorDesc, InteractorId, InteractorRegistry};
use super::render::RenderFrame;
use super::scene::SceneHost;

/// Callback fired on every activity edge.
pub type ActivityListener = Box<dyn FnMut(ActivityEdge) + Send>;

/// Statistics of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TickReport {
    pub status: AwakeStatus,
    pub edge: Option<ActivityEdge>,
    /// `Σ½v²` of the last substep
    pub kinetic_energy: f32,
    /// Whether an interactor changed any height
    pub interaction: bool,
    pub interactors: usize,
    /// Samples probed by the interaction kernels
    pub cells_touched: usize,
    /// Hit records dropped because a body ran out of cells
    pub hits_truncated: usize,
    pub duration_ms: f64,
}

pub struct Surface {
    config: SurfaceConfig,
    field: Heightfield,
    mask: MaskRequest,
    registry: InteractorRegistry,
    activity: ActivityScheduler,

    energy: AtomicAccumulator,
    interaction: AtomicFlag,

    // Occupancy mode
    occupancy: Vec<f32>,
    occupancy_previous: Vec<f32>,
    blocks: InteractionBlocks,

    // Velocity mode
    relative_velocities: Vec<Vec3>,
    surface_motion: MotionEstimator,

    transform: AffineTransform,
    listener: Option<ActivityListener>,
    timer: FrameTimer,
    checked_dt: Option<f32>,
    frame_pending: bool,
    ticks: u64,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("resolution", &self.field.resolution())
            .field("size", &self.field.size())
            .field("mode", &self.config.interaction_mode)
            .field("status", &self.activity.status())
            .field("interactors", &self.registry.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Surface {
    /// Creates an asleep, flat surface sharing `mask`.
    ///
    /// The surface keeps a data request on the mask for its whole life, so
    /// the mask cannot be resized underneath it.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the mask resolution differs
    /// from the configured one.
    pub fn new(mut config: SurfaceConfig, mask: Arc<FixedMask>) -> Result<Self> {
        config.validate()?;
        let resolution = config.resolution;
        // Request first: once held, the mask resolution cannot change.
        let mask = mask.request_data();
        let actual = mask.resolution();
        if actual != resolution {
            return Err(WaveSimError::ResolutionMismatch {
                expected: (resolution.x, resolution.z),
                actual: (actual.x, actual.z),
            });
        }

        let field = Heightfield::new(resolution, config.size)?;
        let n = resolution.sample_count();

        info!(
            "Creating water surface: {}x{} samples, {:.2}x{:.2} units, {:?} interaction",
            resolution.x, resolution.z, config.size.x, config.size.y, config.interaction_mode
        );

        Ok(Self {
            mask,
            field,
            registry: InteractorRegistry::new(config.max_interactors),
            activity: ActivityScheduler::new(
                config.asleep_counter_limit,
                config.kinetic_energy_threshold,
            ),
            energy: AtomicAccumulator::new(),
            interaction: AtomicFlag::new(),
            occupancy: vec![0.0; n],
            occupancy_previous: vec![0.0; n],
            blocks: InteractionBlocks::new(config.max_interactors, config.max_cells_per_interactor),
            relative_velocities: vec![Vec3::zeros(); n],
            surface_motion: MotionEstimator::new(),
            transform: AffineTransform::identity(),
            listener: None,
            timer: FrameTimer::new(),
            checked_dt: None,
            frame_pending: false,
            ticks: 0,
            config,
        })
    }

    /// Creates a surface with its own all-free mask.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid.
    pub fn with_free_mask(mut config: SurfaceConfig) -> Result<Self> {
        config.validate()?;
        let mask = FixedMask::shared(config.resolution);
        Self::new(config, mask)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advances the surface by `dt` seconds.
    ///
    /// Order: transforms, wave substeps (awake only), interaction kernels,
    /// gradients (awake only), buoyancy write-back, activity update.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::InvalidConfig`] when `dt` is not positive. The surface
    /// is left untouched.
    pub fn tick<H: SceneHost + ?Sized>(&mut self, host: &mut H, dt: f32) -> Result<TickReport> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(WaveSimError::InvalidConfig(format!(
                "tick duration must be positive, got {dt}"
            )));
        }
        let started = Instant::now();
        self.warn_if_unstable(dt);

        // Status only changes at the end of the tick
        let awake = self.activity.is_awake();
        let simulate = self.config.simulate;
        let mut report = TickReport {
            status: self.activity.status(),
            edge: None,
            kinetic_energy: 0.0,
            interaction: false,
            interactors: self.registry.len(),
            cells_touched: 0,
            hits_truncated: 0,
            duration_ms: 0.0,
        };

        // 1. Read the scene
        self.update_transforms(host, dt);

        // 2. Wave propagation
        self.energy.reset();
        if awake && simulate {
            self.simulate_substeps(dt);
        }

        // 3. Interaction
        match self.config.interaction_mode {
            InteractionMode::OccupancyBased => {
                let bodies = self.update_occupancy(host, &mut report);
                if simulate && self.config.affect_surface && !self.registry.is_empty() {
                    let _scope = ProfilerScope::new("occupancy_effect");
                    let mask = self.mask.view();
                    let resolution = self.field.resolution();
                    apply_occupancy_effect(
                        &mut self.field.heights,
                        &self.occupancy,
                        &self.occupancy_previous,
                        &mask,
                        resolution,
                        self.config.effect_scale,
                        &self.interaction,
                    );
                }
                if awake && simulate {
                    self.update_gradients();
                }
                if self.config.buoyancy && !bodies.is_empty() {
                    self.apply_buoyancy(host, &bodies, dt);
                }
                self.collect_limit_warnings(&mut report);
            }
            InteractionMode::VelocityBased => {
                self.velocity_interaction(host, dt, &mut report);
                if awake && simulate {
                    self.update_gradients();
                }
            }
        }

        // 4. Activity
        let interaction = self.interaction.take();
        let edge = self.activity.update(self.energy.load_scaled(), interaction);
        if edge == Some(ActivityEdge::FellAsleep) {
            self.reset_simulation_data();
        }
        self.notify(edge);
        if awake && simulate {
            self.frame_pending = true;
        }

        self.ticks += 1;
        self.timer.record(started.elapsed());
        report.status = self.activity.status();
        report.edge = edge;
        report.kinetic_energy = self.energy.load();
        report.interaction = interaction;
        report.duration_ms = self.timer.last_ms();
        debug!(
            tick = self.ticks,
            status = ?report.status,
            kinetic_energy = report.kinetic_energy,
            interaction,
            cells = report.cells_touched,
            truncated = report.hits_truncated,
            elapsed_ms = report.duration_ms,
            "Surface tick"
        );
        Ok(report)
    }

    fn warn_if_unstable(&mut self, dt: f32) {
        if self.checked_dt == Some(dt) {
            return;
        }
        self.checked_dt = Some(dt);
        if !self.check_stability_condition(dt) && self.config.show_setting_warnings {
            warn!(
                dt,
                substeps = self.config.substeps,
                propagation_speed = self.config.propagation_speed,
                "Surface may be unstable, raise substeps or lower the propagation speed"
            );
        }
    }

    fn update_transforms<H: SceneHost + ?Sized>(&mut self, host: &H, dt: f32) {
        self.transform = host.surface_transform();
        if self.config.interaction_mode == InteractionMode::VelocityBased {
            self.surface_motion.update(&self.transform, None, dt, 0.0);
        }
        for slot in 0..self.registry.len() {
            let Some(id) = self.registry.desc(slot).map(|d| d.id) else {
                continue;
            };
            match host.interactor_transform(id) {
                Some(transform) => self.registry.set_transform(slot, transform),
                None => debug!(id = id.0, "No transform for interactor, keeping the last one"),
            }
        }
    }

    fn simulate_substeps(&mut self, dt: f32) {
        let _scope = ProfilerScope::new("wave_substeps");
        let substeps = self.config.substeps.max(1);
        let params = WaveParams {
            dt: dt / substeps as f32,
            propagation_speed: self.config.propagation_speed,
            damping: self.config.damping,
            smoothness: self.config.wave_smoothness,
            speed_tweak: self.config.speed_tweak,
            sample_size: self.field.sample_size(),
        };
        let mask = self.mask.view();
        for _ in 0..substeps {
            wave::step(&mut self.field, &mask, &params, &self.energy);
        }
    }

    fn update_gradients(&mut self) {
        let _scope = ProfilerScope::new("gradients");
        compute_gradients(&mut self.field);
    }

    /// Smallest area covering the projection of every interactor's bounds.
    pub fn interaction_area(&self) -> CellArea {
        let resolution = self.field.resolution();
        let sample_size = self.field.sample_size();
        self.registry
            .colliders()
            .iter()
            .filter_map(|c| {
                CellArea::from_local_bounds(&c.bounds().to_local(&self.transform), resolution, sample_size)
            })
            .fold(CellArea::default(), |acc, area| acc.union(&area))
    }

    /// Raymarches the occupancy of this tick and returns the body snapshots
    /// the hits refer to.
    fn update_occupancy<H: SceneHost + ?Sized>(
        &mut self,
        host: &H,
        report: &mut TickReport,
    ) -> Vec<BodySnapshot> {
        if self.registry.is_empty() || !(self.config.affect_surface || self.config.buoyancy) {
            return Vec::new();
        }
        let _scope = ProfilerScope::new("occupancy");

        std::mem::swap(&mut self.occupancy, &mut self.occupancy_previous);
        self.occupancy.fill(0.0);
        self.blocks.reset();

        let bodies: Vec<BodySnapshot> = self
            .registry
            .bodies()
            .map(|id| match host.rigid_body(id) {
                Some(state) => BodySnapshot::new(state),
                None => {
                    debug!(body = id.0, "Rigid body unknown to the host, treated as kinematic");
                    BodySnapshot::new(RigidBodyState {
                        is_kinematic: true,
                        ..Default::default()
                    })
                }
            })
            .collect();

        let resolution = self.field.resolution();
        let area = self.interaction_area().expanded(1, resolution);
        report.cells_touched = area.cell_count();

        let params = OccupancyParams {
            surface: self.transform,
            resolution,
            sample_size: self.field.sample_size(),
            detection_depth: self.config.detection_depth,
            area,
            affect_surface: self.config.affect_surface,
            buoyancy: self.config.buoyancy,
        };
        let mask = self.mask.view();
        raymarch_occupancy(
            &mut self.occupancy,
            self.registry.colliders(),
            self.registry.collider_to_body(),
            &mask,
            &self.blocks,
            &params,
        );
        bodies
    }

    fn apply_buoyancy<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        bodies: &[BodySnapshot],
        dt: f32,
    ) {
        let _scope = ProfilerScope::new("buoyancy");
        let params = BuoyancyParams {
            surface: self.transform,
            resolution: self.field.resolution(),
            sample_size: self.field.sample_size(),
            detection_depth: self.config.detection_depth,
            density: self.config.density,
            gravity: self.config.gravity.norm(),
            damping: self.config.buoyancy_damping,
            horizontal: self.config.horizontal_buoyancy,
            dt,
        };
        let deltas = apply_buoyant_forces(bodies, &self.blocks, self.field.gradients(), &params);

        for ((id, body), delta) in self.registry.bodies().zip(bodies).zip(&deltas) {
            if body.state.is_kinematic {
                continue;
            }
            host.set_body_velocities(
                id,
                body.state.linear_velocity + delta.linear,
                body.state.angular_velocity + delta.angular,
            );
        }
    }

    fn collect_limit_warnings(&self, report: &mut TickReport) {
        for (slot, id) in self.registry.bodies().enumerate() {
            if !self.blocks.has_reached_cell_limit(slot) {
                continue;
            }
            let truncated = self.blocks.truncated(slot);
            report.hits_truncated += truncated;
            if self.config.show_setting_warnings {
                warn!(
                    body = id.0,
                    limit = self.config.max_cells_per_interactor,
                    truncated,
                    "Rigid body reached the cell limit, increase max_cells_per_interactor"
                );
            }
        }
    }

    fn velocity_interaction<H: SceneHost + ?Sized>(
        &mut self,
        host: &H,
        dt: f32,
        report: &mut TickReport,
    ) {
        if self.registry.is_empty() {
            return;
        }
        let _scope = ProfilerScope::new("velocity_transfer");
        self.relative_velocities.fill(Vec3::zeros());

        let motions = self.registry.update_motions(host, dt);
        let moving: Vec<MovingCollider<'_>> = self
            .registry
            .colliders()
            .iter()
            .zip(motions)
            .map(|(collider, motion)| MovingCollider { collider, motion })
            .collect();

        let resolution = self.field.resolution();
        let area = self.interaction_area();
        let params = VelocityTransferParams {
            surface: self.transform,
            surface_motion: self.surface_motion.motion(),
            resolution,
            sample_size: self.field.sample_size(),
            min_speed: self.config.interactor_min_speed,
            max_speed: self.config.interactor_max_speed,
        };
        let mask = self.mask.view();
        sample_velocities(&mut self.relative_velocities, &moving, &mask, area, &params);

        let push_area = area.expanded(1, resolution);
        report.cells_touched = push_area.cell_count();
        if self.config.simulate {
            heights_from_velocities(
                &mut self.field.heights,
                &self.relative_velocities,
                &mask,
                push_area,
                resolution,
                self.config.vertical_push_scale,
                self.config.horizontal_push_scale,
                dt,
                &self.interaction,
            );
        }
    }

    fn reset_simulation_data(&mut self) {
        self.field.reset();
        compute_gradients(&mut self.field);
        self.relative_velocities.fill(Vec3::zeros());
        self.frame_pending = false;
    }

    fn notify(&mut self, edge: Option<ActivityEdge>) {
        if let (Some(edge), Some(listener)) = (edge, self.listener.as_mut()) {
            listener(edge);
        }
    }

    // ------------------------------------------------------------------
    // Interactors
    // ------------------------------------------------------------------

    /// Registers an interactor currently placed at `transform`.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::InteractorLimit`] when `max_interactors` are already
    /// registered.
    pub fn add_interactor(&mut self, desc: InteractorDesc, transform: AffineTransform) -> Result<usize> {
        self.registry.add(desc, transform)
    }

    /// # Errors
    ///
    /// [`WaveSimError::UnknownInteractor`] when `id` is not registered.
    pub fn remove_interactor(&mut self, id: InteractorId) -> Result<()> {
        self.registry.remove(id)?;
        if self.registry.is_empty() {
            self.occupancy.fill(0.0);
            self.occupancy_previous.fill(0.0);
            self.relative_velocities.fill(Vec3::zeros());
        }
        Ok(())
    }

    pub fn registry(&self) -> &InteractorRegistry {
        &self.registry
    }

    /// Local-space volume in which colliders are considered interactors.
    ///
    /// Velocity mode spans the configured distances around the rest surface.
    /// Occupancy mode spans the detection columns, one sample wider on each side.
    pub fn detection_volume(&self) -> Aabb {
        let size = self.field.size();
        let sample = self.field.sample_size();
        match self.config.interaction_mode {
            InteractionMode::VelocityBased => Aabb {
                min: Vec3::new(0.0, -self.config.downwards_detection_distance, 0.0),
                max: Vec3::new(size.x, self.config.upwards_detection_distance, size.y),
            },
            InteractionMode::OccupancyBased => Aabb {
                min: Vec3::new(-sample.x, -self.config.detection_depth, -sample.y),
                max: Vec3::new(
                    size.x + sample.x,
                    self.config.upwards_detection_distance,
                    size.y + sample.y,
                ),
            },
        }
    }

    /// Whether `collider` reaches into the detection volume.
    pub fn overlaps(&self, collider: &Collider) -> bool {
        collider
            .bounds()
            .to_local(&self.transform)
            .intersects(&self.detection_volume())
    }

    // ------------------------------------------------------------------
    // Samples
    // ------------------------------------------------------------------

    /// Flat index of sample `(x, z)`.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::SampleOutOfRange`] outside the grid.
    pub fn sample_index(&self, x: i64, z: i64) -> Result<usize> {
        self.field.resolution().checked_index(x, z)
    }

    /// Sample nearest to a world point, `None` when the point projects
    /// outside the surface.
    pub fn nearest_sample(&self, world: Vec3) -> Option<usize> {
        let local = self.transform.inverse_transform_point(world);
        let sample = self.field.sample_size();
        let x = (local.x / sample.x).round() as i64;
        let z = (local.z / sample.y).round() as i64;
        self.field.resolution().checked_index(x, z).ok()
    }

    /// # Errors
    ///
    /// [`WaveSimError::SampleOutOfRange`] for an index outside the grid.
    pub fn height_at(&self, index: usize) -> Result<f32> {
        let index = self.field.resolution().check_index(index)?;
        Ok(self.field.height(index))
    }

    /// Moves one sample by `offset` and wakes the surface.
    ///
    /// # Errors
    ///
    /// [`WaveSimError::SampleOutOfRange`] for an index outside the grid and
    /// [`WaveSimError::FixedSample`] for a fixed sample. Nothing changes on error.
    pub fn set_height_offset(&mut self, index: usize, offset: f32) -> Result<()> {
        let index = self.field.resolution().check_index(index)?;
        if self.mask.is_fixed(index) {
            return Err(WaveSimError::FixedSample(index));
        }
        self.field.add_height(index, offset);
        let edge = self.activity.force_awake();
        self.notify(edge);
        Ok(())
    }

    /// Position of sample `index` in local or world space.
    ///
    /// # Arguments
    ///
    /// * `index` - Flat sample index
    /// * `world_space` - Apply the surface transform
    /// * `include_height` - Use the current height instead of 0
    ///
    /// # Errors
    ///
    /// [`WaveSimError::SampleOutOfRange`] for an index outside the grid.
    pub fn position_from_sample(
        &self,
        index: usize,
        world_space: bool,
        include_height: bool,
    ) -> Result<Vec3> {
        let resolution = self.field.resolution();
        let index = resolution.check_index(index)?;
        let (x, z) = resolution.coords(index);
        let mut position = self.field.sample_position(x, z);
        if include_height {
            position.y = self.field.height(index);
        }
        if world_space {
            position = self.transform.transform_point(position);
        }
        Ok(position)
    }

    /// `dt / substeps < min(dx, dz) / c`.
    pub fn check_stability_condition(&self, dt: f32) -> bool {
        is_stable(
            dt,
            self.config.substeps,
            self.field.sample_size(),
            self.config.propagation_speed,
        )
    }

    /// Marks every free sample covered by an obstacle as fixed.
    ///
    /// Each sample is probed with a box one cell wide spanning the velocity
    /// detection distances. Returns how many samples were newly fixed.
    ///
    /// # Errors
    ///
    /// Propagates mask mutation errors.
    pub fn fix_collisions(&self, obstacles: &[Collider]) -> Result<usize> {
        let resolution = self.field.resolution();
        let sample = self.field.sample_size();
        let half_y =
            (self.config.upwards_detection_distance + self.config.downwards_detection_distance) * 0.5;
        let offset_y = self.config.upwards_detection_distance - half_y;
        let half = Vec3::new(sample.x * 0.5, half_y, sample.y * 0.5);

        let mut fixed = 0;
        for index in 0..resolution.sample_count() {
            if self.mask.is_fixed(index) {
                continue;
            }
            let (x, z) = resolution.coords(index);
            let mut center = self.field.sample_position(x, z);
            center.y = offset_y;
            let center_ws = self.transform.transform_point(center);
            let hit = obstacles.iter().any(|obstacle| {
                let nearest = obstacle.nearest_point_from(center_ws, 0.0);
                if nearest.distance <= 0.0 {
                    return true;
                }
                let local = self.transform.inverse_transform_point(nearest.point) - center;
                local.x.abs() <= half.x && local.y.abs() <= half.y && local.z.abs() <= half.z
            });
            if hit {
                self.mask.set_fixed(index, true)?;
                fixed += 1;
            }
        }
        info!(fixed, "Fixed samples covered by obstacles");
        Ok(fixed)
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Applies new tunables.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or changes the resolution,
    /// size, interaction mode or limits, which need a new surface.
    pub fn update_config(&mut self, mut config: SurfaceConfig) -> Result<()> {
        config.validate()?;
        if self.config.is_structural_change(&config) {
            return Err(WaveSimError::InvalidConfig(
                "resolution, size, interaction mode and limits are fixed for a surface".into(),
            ));
        }
        self.activity
            .set_limits(config.asleep_counter_limit, config.kinetic_energy_threshold);
        self.config = config;
        self.checked_dt = None;
        debug!("Surface configuration updated");
        Ok(())
    }

    pub fn set_activity_listener(&mut self, listener: impl FnMut(ActivityEdge) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn clear_activity_listener(&mut self) {
        self.listener = None;
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.activity.is_awake()
    }

    #[inline]
    pub fn awake_status(&self) -> AwakeStatus {
        self.activity.status()
    }

    pub fn resolution(&self) -> GridResolution {
        self.field.resolution()
    }

    pub fn field(&self) -> &Heightfield {
        &self.field
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    /// Shared fixed mask.
    pub fn mask(&self) -> &Arc<FixedMask> {
        self.mask.mask()
    }

    /// Interior heights, row-major.
    pub fn heights(&self) -> Vec<f32> {
        self.field.interior_heights()
    }

    pub fn velocities(&self) -> &[f32] {
        self.field.velocities()
    }

    pub fn accelerations(&self) -> &[f32] {
        self.field.accelerations()
    }

    /// Occupancy of the latest occupancy tick, local units.
    pub fn occupancy(&self) -> &[f32] {
        &self.occupancy
    }

    /// Relative interactor velocities of the latest velocity tick.
    pub fn relative_velocities(&self) -> &[Vec3] {
        &self.relative_velocities
    }

    pub fn interaction_blocks(&self) -> &InteractionBlocks {
        &self.blocks
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Shading data of the latest tick. Returns `None` while asleep or when
    /// no simulated tick happened since the previous frame.
    pub fn take_render_frame(&mut self) -> Option<RenderFrame> {
        if !(self.frame_pending && self.is_awake() && self.config.simulate) {
            return None;
        }
        self.frame_pending = false;
        Some(RenderFrame::from_field(&self.field))
    }
}
