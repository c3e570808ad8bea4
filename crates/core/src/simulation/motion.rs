//! Velocity estimation from successive transforms.

use crate::core_types::{AffineTransform, Quat, RigidBodyState, Vec3};
use crate::solver::RigidMotion;

/// Angular velocity that rotates `old` into `new` over `dt`, small-angle form.
pub fn angular_velocity_between(old: &Quat, new: &Quat, dt: f32) -> Vec3 {
    if dt <= 0.0 {
        return Vec3::zeros();
    }
    let delta = (new * old.inverse()).into_inner();
    // Shortest arc
    let sign = if delta.w < 0.0 { -1.0 } else { 1.0 };
    delta.imag() * (sign * 2.0 / dt)
}

/// Tracks one moving object across ticks.
#[derive(Debug, Clone, Default)]
pub struct MotionEstimator {
    last: Option<AffineTransform>,
    motion: RigidMotion,
}

impl MotionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Motion computed by the latest [`Self::update`].
    pub fn motion(&self) -> RigidMotion {
        self.motion
    }

    /// Forgets the previous transform, so the next update reports no motion.
    pub fn reset(&mut self) {
        self.last = None;
        self.motion = RigidMotion::default();
    }

    /// Updates the estimate for the current `transform`.
    ///
    /// A dynamic rigid body reports its own velocities and rotates about its
    /// center of mass. Anything else is differentiated from the previous
    /// transform. With `smoothing > 0` the linear velocity is blended with the
    /// previous estimate: `v = lerp(v_old, v_new, 1 − smoothing)`.
    ///
    /// # Arguments
    ///
    /// * `transform` - Current world transform
    /// * `body` - Rigid body driving the object, if any
    /// * `dt` - Tick duration
    /// * `smoothing` - Blend factor in `[0, 1)`
    pub fn update(
        &mut self,
        transform: &AffineTransform,
        body: Option<&RigidBodyState>,
        dt: f32,
        smoothing: f32,
    ) -> RigidMotion {
        let previous = self.motion.linear;
        let mut next = match body {
            Some(body) if !body.is_kinematic => RigidMotion {
                linear: body.linear_velocity,
                angular: body.angular_velocity,
                pivot: body.center_of_mass,
            },
            _ => match &self.last {
                Some(last) if dt > 0.0 => RigidMotion {
                    linear: (transform.translation - last.translation) / dt,
                    angular: angular_velocity_between(&last.rotation, &transform.rotation, dt),
                    pivot: transform.translation,
                },
                _ => RigidMotion {
                    pivot: transform.translation,
                    ..Default::default()
                },
            },
        };
        if smoothing > 0.0 {
            let keep = smoothing.clamp(0.0, 1.0);
            next.linear = previous.lerp(&next.linear, 1.0 - keep);
        }
        self.last = Some(*transform);
        self.motion = next;
        next
    }
}
