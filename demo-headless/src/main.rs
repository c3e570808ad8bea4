use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nalgebra::UnitQuaternion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wave_sim_core::{
    AffineTransform, BodyId, ColliderShape, GridResolution, InteractionMode, InteractorDesc,
    InteractorId, RigidBodyState, SceneState, Surface, SurfaceConfig, Vec2, Vec3,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Velocity,
    Occupancy,
}

/// Headless water surface demo: objects dropped into a pool
#[derive(Parser, Debug)]
#[command(name = "wave-sim-demo")]
#[command(about = "Drops spheres and boxes into a simulated water surface", long_about = None)]
struct Args {
    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 600)]
    ticks: u32,

    /// Tick duration in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f32,

    /// Samples per axis
    #[arg(short, long, default_value_t = 64)]
    resolution: usize,

    /// Pool edge length in world units
    #[arg(long, default_value_t = 20.0)]
    size: f32,

    /// Interaction mode
    #[arg(short, long, value_enum, default_value_t = Mode::Occupancy)]
    mode: Mode,

    /// Number of dropped objects
    #[arg(short, long, default_value_t = 4)]
    objects: u32,

    /// JSON surface configuration, overrides the options above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for drop positions
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Report interval in ticks
    #[arg(long, default_value_t = 60)]
    report_interval: u32,
}

fn load_config(args: &Args) -> Result<SurfaceConfig, Box<dyn std::error::Error>> {
    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&text)?);
    }
    Ok(SurfaceConfig {
        resolution: GridResolution::new(args.resolution, args.resolution)?,
        size: Vec2::new(args.size, args.size),
        interaction_mode: match args.mode {
            Mode::Velocity => InteractionMode::VelocityBased,
            Mode::Occupancy => InteractionMode::OccupancyBased,
        },
        substeps: 2,
        max_interactors: args.objects.max(1) as usize,
        max_cells_per_interactor: 400,
        ..SurfaceConfig::default()
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        error!("Demo failed: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Water Surface Demo ===\n");

    let config = load_config(args)?;
    let gravity = config.gravity;
    let size = config.size;
    let mut surface = Surface::with_free_mask(config)?;
    let mut scene = SceneState::new(AffineTransform::identity());

    println!(
        "Surface: {}x{} samples over {:.1}x{:.1} units, {:?}",
        surface.resolution().x,
        surface.resolution().z,
        size.x,
        size.y,
        surface.config().interaction_mode
    );
    if !surface.check_stability_condition(args.dt) {
        println!("Warning: dt {:.4}s is above the stability limit", args.dt);
    }

    // Scatter objects above the pool
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut attached = Vec::new();
    for i in 0..args.objects {
        let id = InteractorId(u64::from(i));
        let body = BodyId(u64::from(i));
        let shape = if i % 2 == 0 {
            ColliderShape::Sphere {
                radius: rng.random_range(0.5..1.2),
            }
        } else {
            let edge = rng.random_range(0.8..1.6);
            ColliderShape::Box {
                size: Vec3::new(edge, edge * 0.5, edge),
            }
        };
        let position = Vec3::new(
            rng.random_range(0.2..0.8) * size.x,
            rng.random_range(1.5..4.0),
            rng.random_range(0.2..0.8) * size.y,
        );
        let rotation = UnitQuaternion::from_euler_angles(0.0, rng.random_range(0.0..std::f32::consts::TAU), 0.0);
        let transform = AffineTransform::from_translation(position).with_rotation(rotation);

        scene.set_interactor_transform(id, transform);
        scene.set_body(
            body,
            RigidBodyState {
                mass: 0.5,
                center_of_mass: position,
                rotation,
                ..RigidBodyState::default()
            },
        );
        surface.add_interactor(InteractorDesc::new(id, shape).with_body(body), transform)?;
        attached.push((id, body));
        info!(id = id.0, ?shape, "Dropping object at ({:.2}, {:.2}, {:.2})", position.x, position.y, position.z);
    }

    println!("\nSimulating {} ticks of {:.4}s\n", args.ticks, args.dt);
    let mut peak_energy = 0.0f32;
    let mut frames = 0u32;
    for tick in 1..=args.ticks {
        scene.integrate_bodies(gravity, args.dt, &attached);
        let report = surface.tick(&mut scene, args.dt)?;
        peak_energy = peak_energy.max(report.kinetic_energy);
        if surface.take_render_frame().is_some() {
            frames += 1;
        }

        if tick % args.report_interval.max(1) == 0 || report.edge.is_some() {
            let heights = surface.heights();
            let (min, max) = heights
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)));
            println!(
                "[t={:6.2}s] {:?} energy={:.5} heights=[{:+.3}, {:+.3}] cells={} {:.2}ms",
                tick as f32 * args.dt,
                report.status,
                report.kinetic_energy,
                min,
                max,
                report.cells_touched,
                report.duration_ms
            );
            for (id, body) in &attached {
                if let Some(state) = scene.body(*body) {
                    println!(
                        "    object {}: y={:+.3} vy={:+.3}",
                        id.0, state.center_of_mass.y, state.linear_velocity.y
                    );
                }
            }
        }
    }

    println!("\n=== Summary ===");
    println!("Peak kinetic energy: {peak_energy:.5}");
    println!("Render frames produced: {frames}");
    println!("Final status: {:?}", surface.awake_status());
    println!("Average tick: {:.3}ms", surface.timer().average_ms());
    Ok(())
}
