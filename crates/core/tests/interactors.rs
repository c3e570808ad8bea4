mod common;

use approx::assert_relative_eq;
use wave_sim_core::{
    AffineTransform, BodyId, ColliderShape, InteractionMode, InteractorDesc, InteractorId,
    RigidBodyState, SceneState, Surface, SurfaceConfig, Vec3, WaveSimError,
};

const SPHERE: ColliderShape = ColliderShape::Sphere { radius: 1.0 };

fn at(x: f32, y: f32, z: f32) -> AffineTransform {
    AffineTransform::from_translation(Vec3::new(x, y, z))
}

#[test]
fn test_surface_rejects_interactors_over_the_cap() {
    let mut surface = Surface::with_free_mask(SurfaceConfig {
        max_interactors: 2,
        ..common::unit_spacing_config(11, InteractionMode::VelocityBased)
    })
    .unwrap();
    for id in 1..=2 {
        surface
            .add_interactor(InteractorDesc::new(InteractorId(id), SPHERE), at(5.0, 0.0, 5.0))
            .unwrap();
    }
    let err = surface.add_interactor(
        InteractorDesc::new(InteractorId(3), SPHERE),
        at(5.0, 0.0, 5.0),
    );
    assert!(matches!(err, Err(WaveSimError::InteractorLimit { limit: 2 })));
    assert_eq!(surface.registry().len(), 2);
    assert!(matches!(
        surface.remove_interactor(InteractorId(3)),
        Err(WaveSimError::UnknownInteractor(3))
    ));
}

fn floating_sphere() -> (Surface, SceneState) {
    let mut surface = Surface::with_free_mask(SurfaceConfig {
        max_cells_per_interactor: 200,
        ..common::unit_spacing_config(11, InteractionMode::OccupancyBased)
    })
    .unwrap();
    let mut scene = SceneState::default();
    let id = InteractorId(1);
    let body = BodyId(1);
    scene.set_interactor_transform(id, at(5.0, 0.0, 5.0));
    scene.set_body(
        body,
        RigidBodyState {
            mass: 1.0,
            center_of_mass: Vec3::new(5.0, 0.0, 5.0),
            ..Default::default()
        },
    );
    surface
        .add_interactor(InteractorDesc::new(id, SPHERE).with_body(body), at(5.0, 0.0, 5.0))
        .unwrap();
    (surface, scene)
}

#[test]
fn test_submerged_sphere_is_lifted_and_wakes_the_surface() {
    let (mut surface, mut scene) = floating_sphere();
    let report = surface.tick(&mut scene, 0.02).unwrap();

    let body = scene.body(BodyId(1)).unwrap();
    assert!(body.linear_velocity.y > 0.0);
    // Hits are symmetric around the center of mass
    assert!(body.linear_velocity.x.abs() < 1e-3);
    assert!(body.angular_velocity.norm() < 1e-3);
    assert!(report.interaction);
    assert!(surface.is_awake());
    assert_eq!(report.hits_truncated, 0);

    let center = surface.sample_index(5, 5).unwrap();
    let corner = surface.sample_index(0, 0).unwrap();
    assert!(surface.occupancy()[center] > 0.0);
    assert_eq!(surface.occupancy()[corner], 0.0);
    // Water pushed out of the occupied columns
    let beside = surface.sample_index(4, 5).unwrap();
    assert!(surface.height_at(beside).unwrap() > 0.0);
    assert_eq!(surface.height_at(corner).unwrap(), 0.0);
}

#[test]
fn test_kinematic_body_keeps_its_velocity() {
    let (mut surface, mut scene) = floating_sphere();
    if let Some(body) = scene.body_mut(BodyId(1)) {
        body.is_kinematic = true;
    }
    surface.tick(&mut scene, 0.02).unwrap();
    assert_eq!(scene.body(BodyId(1)).unwrap().linear_velocity, Vec3::zeros());
}

#[test]
fn test_removing_last_interactor_clears_occupancy() {
    let (mut surface, mut scene) = floating_sphere();
    surface.tick(&mut scene, 0.02).unwrap();
    assert!(surface.occupancy().iter().any(|&o| o > 0.0));

    surface.remove_interactor(InteractorId(1)).unwrap();
    assert!(surface.registry().is_empty());
    assert!(surface.occupancy().iter().all(|&o| o == 0.0));
}

#[test]
fn test_falling_sphere_pushes_the_center_down() {
    let mut surface = Surface::with_free_mask(common::unit_spacing_config(
        11,
        InteractionMode::VelocityBased,
    ))
    .unwrap();
    let mut scene = SceneState::default();
    let id = InteractorId(7);
    scene.set_interactor_transform(id, at(5.0, 0.5, 5.0));
    surface
        .add_interactor(InteractorDesc::new(id, SPHERE), at(5.0, 0.5, 5.0))
        .unwrap();

    // First tick only records the transform
    let report = surface.tick(&mut scene, 0.02).unwrap();
    assert!(!report.interaction);

    scene.set_interactor_transform(id, at(5.0, 0.3, 5.0));
    let report = surface.tick(&mut scene, 0.02).unwrap();
    assert!(report.interaction);
    assert!(surface.is_awake());

    let center = surface.sample_index(5, 5).unwrap();
    // v = −10, push = v · 0.5 · 0.02
    assert_relative_eq!(surface.relative_velocities()[center].y, -10.0, epsilon = 1e-3);
    assert_relative_eq!(surface.height_at(center).unwrap(), -0.1, epsilon = 1e-4);
    // Outside the sphere nothing moved vertically
    let beside = surface.sample_index(4, 5).unwrap();
    assert_eq!(surface.height_at(beside).unwrap(), 0.0);
}
