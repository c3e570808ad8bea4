//! Host-side scene access.
//!
//! The engine never owns transforms or rigid bodies. Each tick it reads them
//! through a [`SceneHost`] and writes body velocities back through it.

use rustc_hash::FxHashMap;

use crate::core_types::{AffineTransform, RigidBodyState, Vec3};

use super::registry::{BodyId, InteractorId};

/// Transform and rigid-body provider.
pub trait SceneHost {
    /// World transform of the surface.
    fn surface_transform(&self) -> AffineTransform;

    /// World transform of an interactor, `None` when the host no longer knows it.
    fn interactor_transform(&self, id: InteractorId) -> Option<AffineTransform>;

    fn rigid_body(&self, id: BodyId) -> Option<RigidBodyState>;

    /// Stores new velocities of a non-kinematic body.
    fn set_body_velocities(&mut self, id: BodyId, linear: Vec3, angular: Vec3);
}

/// In-memory [`SceneHost`] for headless runs, tests and the C API.
#[derive(Debug, Clone, Default)]
pub struct SceneState {
    pub surface: AffineTransform,
    pub interactors: FxHashMap<InteractorId, AffineTransform>,
    pub bodies: FxHashMap<BodyId, RigidBodyState>,
}

impl SceneState {
    pub fn new(surface: AffineTransform) -> Self {
        Self {
            surface,
            ..Default::default()
        }
    }

    pub fn set_interactor_transform(&mut self, id: InteractorId, transform: AffineTransform) {
        self.interactors.insert(id, transform);
    }

    pub fn set_body(&mut self, id: BodyId, state: RigidBodyState) {
        self.bodies.insert(id, state);
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBodyState> {
        self.bodies.get(&id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBodyState> {
        self.bodies.get_mut(&id)
    }

    /// Explicit Euler step of every dynamic body under `gravity`. Interactor
    /// transforms listed in `attached` follow their body's center of mass.
    pub fn integrate_bodies(
        &mut self,
        gravity: Vec3,
        dt: f32,
        attached: &[(InteractorId, BodyId)],
    ) {
        for body in self.bodies.values_mut().filter(|b| !b.is_kinematic) {
            body.linear_velocity += gravity * dt;
            body.center_of_mass += body.linear_velocity * dt;
        }
        for (interactor, body) in attached {
            let Some(state) = self.bodies.get(body) else {
                continue;
            };
            let com = state.center_of_mass;
            if let Some(transform) = self.interactors.get_mut(interactor) {
                transform.translation = com;
            }
        }
    }
}

impl SceneHost for SceneState {
    fn surface_transform(&self) -> AffineTransform {
        self.surface
    }

    fn interactor_transform(&self, id: InteractorId) -> Option<AffineTransform> {
        self.interactors.get(&id).copied()
    }

    fn rigid_body(&self, id: BodyId) -> Option<RigidBodyState> {
        self.bodies.get(&id).copied()
    }

    fn set_body_velocities(&mut self, id: BodyId, linear: Vec3, angular: Vec3) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.linear_velocity = linear;
            body.angular_velocity = angular;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integrate_moves_attached_interactor() {
        let mut scene = SceneState::default();
        scene.set_body(BodyId(1), RigidBodyState::default());
        scene.set_interactor_transform(InteractorId(1), AffineTransform::identity());
        scene.integrate_bodies(
            Vec3::new(0.0, -10.0, 0.0),
            0.1,
            &[(InteractorId(1), BodyId(1))],
        );
        let body = scene.body(BodyId(1)).unwrap();
        assert_relative_eq!(body.linear_velocity.y, -1.0);
        assert_relative_eq!(body.center_of_mass.y, -0.1);
        let t = scene.interactor_transform(InteractorId(1)).unwrap();
        assert_relative_eq!(t.translation.y, -0.1);
    }

    #[test]
    fn test_kinematic_body_ignores_velocity_writes_from_gravity() {
        let mut scene = SceneState::default();
        scene.set_body(
            BodyId(2),
            RigidBodyState {
                is_kinematic: true,
                ..Default::default()
            },
        );
        scene.integrate_bodies(Vec3::new(0.0, -10.0, 0.0), 0.1, &[]);
        assert_eq!(scene.body(BodyId(2)).unwrap().linear_velocity, Vec3::zeros());
    }
}
