//! Analytic colliders with signed-distance queries.
//!
//! Every query works in the collider's unscaled frame: the transform's
//! rotation and translation are undone, while scale is folded into the shape
//! parameters. Non-uniform scale therefore stretches boxes per axis, and
//! spheres and capsule radii take the largest relevant scale component.

use serde::{Deserialize, Serialize};

use crate::core_types::{Aabb, AffineTransform, Vec3};

/// Principal axis of a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    #[inline]
    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::x(),
            Axis::Y => Vec3::y(),
            Axis::Z => Vec3::z(),
        }
    }
}

/// Shape parameters in the collider's local, unscaled units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    /// `height` is the full length including both caps.
    Capsule { radius: f32, height: f32, axis: Axis },
    /// Full edge lengths.
    Box { size: Vec3 },
}

/// Result of a nearest-point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPoint {
    /// Negative inside the (thickened) collider
    pub distance: f32,
    /// Closest point on the thickened surface, world space
    pub point: Vec3,
}

/// A shape placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    shape: ColliderShape,
    center: Vec3,
    contact_offset: f32,
    transform: AffineTransform,
    bounds: Aabb,
}

impl Collider {
    /// # Arguments
    ///
    /// * `shape` - Shape parameters
    /// * `center` - Offset of the shape from the transform origin, local units
    /// * `contact_offset` - Extra skin added to every distance query
    /// * `transform` - Local-to-world transform
    pub fn new(
        shape: ColliderShape,
        center: Vec3,
        contact_offset: f32,
        transform: AffineTransform,
    ) -> Self {
        let mut collider = Self {
            shape,
            center,
            contact_offset,
            transform,
            bounds: Aabb {
                min: Vec3::zeros(),
                max: Vec3::zeros(),
            },
        };
        collider.bounds = collider.compute_bounds();
        collider
    }

    pub fn sphere(radius: f32, transform: AffineTransform) -> Self {
        Self::new(ColliderShape::Sphere { radius }, Vec3::zeros(), 0.0, transform)
    }

    pub fn cuboid(size: Vec3, transform: AffineTransform) -> Self {
        Self::new(ColliderShape::Box { size }, Vec3::zeros(), 0.0, transform)
    }

    pub fn capsule(radius: f32, height: f32, axis: Axis, transform: AffineTransform) -> Self {
        Self::new(
            ColliderShape::Capsule {
                radius,
                height,
                axis,
            },
            Vec3::zeros(),
            0.0,
            transform,
        )
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    /// Moves the collider and refreshes its cached world bounds.
    pub fn set_transform(&mut self, transform: AffineTransform) {
        self.transform = transform;
        self.bounds = self.compute_bounds();
    }

    /// Cached world-space bounds including the contact offset.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Center of the shape in world space.
    pub fn world_center(&self) -> Vec3 {
        self.transform.transform_point_unscaled(self.center_scaled())
    }

    #[inline]
    fn center_scaled(&self) -> Vec3 {
        self.center.component_mul(&self.transform.scale)
    }

    /// Point relative to the scaled shape center, in the unscaled collider frame.
    #[inline]
    fn to_shape_space(&self, point: Vec3) -> Vec3 {
        self.transform.inverse_transform_point_unscaled(point) - self.center_scaled()
    }

    #[inline]
    fn to_world(&self, point: Vec3) -> Vec3 {
        self.transform
            .transform_point_unscaled(point + self.center_scaled())
    }

    /// Signed distance from `point` to the collider thickened by `thickness`
    /// and the contact offset, with the nearest surface point.
    pub fn nearest_point_from(&self, point: Vec3, thickness: f32) -> NearestPoint {
        let skin = self.contact_offset + thickness;
        match self.shape {
            ColliderShape::Sphere { radius } => self.nearest_on_sphere(radius, point, skin),
            ColliderShape::Capsule {
                radius,
                height,
                axis,
            } => self.nearest_on_capsule(radius, height, axis, point, skin),
            ColliderShape::Box { size } => self.nearest_on_box(size, point, skin),
        }
    }

    /// Whether `point` lies strictly inside the collider including contact offset.
    pub fn contains(&self, point: Vec3) -> bool {
        self.nearest_point_from(point, 0.0).distance < 0.0
    }

    fn scaled_sphere_radius(&self, radius: f32) -> f32 {
        radius * self.transform.max_scale()
    }

    /// Scaled radius and half height of a capsule.
    fn scaled_capsule(&self, radius: f32, height: f32, axis: Axis) -> (f32, f32) {
        let scale = self.transform.scale.abs();
        let radius_scale = match axis {
            Axis::X => scale.y.max(scale.z),
            Axis::Y => scale.x.max(scale.z),
            Axis::Z => scale.x.max(scale.y),
        };
        let r = radius * radius_scale;
        let half = r.max(height * 0.5 * scale[axis.index()]);
        (r, half)
    }

    fn scaled_box_half(&self, size: Vec3) -> Vec3 {
        size.component_mul(&self.transform.scale.abs()) * 0.5
    }

    fn nearest_on_sphere(&self, radius: f32, point: Vec3, skin: f32) -> NearestPoint {
        let local = self.to_shape_space(point);
        let full_radius = self.scaled_sphere_radius(radius) + skin;
        let dist = local.norm();
        let normal = if dist > f32::EPSILON {
            local / dist
        } else {
            Vec3::y()
        };
        NearestPoint {
            distance: dist - full_radius,
            point: self.to_world(normal * full_radius),
        }
    }

    fn nearest_on_capsule(
        &self,
        radius: f32,
        height: f32,
        axis: Axis,
        point: Vec3,
        skin: f32,
    ) -> NearestPoint {
        let local = self.to_shape_space(point);
        let (r, half) = self.scaled_capsule(radius, height, axis);
        let reach = half - r;
        let along = local[axis.index()].clamp(-reach, reach);
        let on_segment = axis.unit() * along;

        let delta = local - on_segment;
        let dist = delta.norm();
        let normal = if dist > f32::EPSILON {
            delta / dist
        } else {
            // On the segment: any direction orthogonal to the axis
            match axis {
                Axis::Y => Vec3::x(),
                _ => Vec3::y(),
            }
        };
        let full_radius = r + skin;
        NearestPoint {
            distance: dist - full_radius,
            point: self.to_world(on_segment + normal * full_radius),
        }
    }

    fn nearest_on_box(&self, size: Vec3, point: Vec3, skin: f32) -> NearestPoint {
        let local = self.to_shape_space(point);
        let half = self.scaled_box_half(size) + Vec3::repeat(skin);
        let depth = half - local.abs();

        let (hit, sign) = if depth.min() >= 0.0 {
            // Inside: push out through the face of least penetration
            let axis = depth.imin();
            let mut hit = local;
            hit[axis] = if local[axis] >= 0.0 {
                half[axis]
            } else {
                -half[axis]
            };
            (hit, -1.0)
        } else {
            (local.sup(&(-half)).inf(&half), 1.0)
        };

        NearestPoint {
            distance: sign * (local - hit).norm(),
            point: self.to_world(hit),
        }
    }

    fn compute_bounds(&self) -> Aabb {
        let skin = Vec3::repeat(self.contact_offset);
        let local = match self.shape {
            ColliderShape::Sphere { radius } => {
                Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(self.scaled_sphere_radius(radius)) + skin)
            }
            ColliderShape::Capsule {
                radius,
                height,
                axis,
            } => {
                let (r, half) = self.scaled_capsule(radius, height, axis);
                let mut extents = Vec3::repeat(r);
                extents[axis.index()] = half;
                Aabb::from_center_extents(Vec3::zeros(), extents + skin)
            }
            ColliderShape::Box { size } => {
                Aabb::from_center_extents(Vec3::zeros(), self.scaled_box_half(size) + skin)
            }
        };
        let corners = local.corners().map(|c| self.to_world(c));
        Aabb::from_points(corners).unwrap_or(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Quat;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_sphere_distance_and_hit_point() {
        let c = Collider::sphere(1.0, AffineTransform::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let q = c.nearest_point_from(Vec3::new(0.0, 5.0, 0.0), 0.0);
        assert_relative_eq!(q.distance, 2.0);
        assert_relative_eq!(q.point.y, 3.0);
        let inside = c.nearest_point_from(Vec3::new(0.0, 2.5, 0.0), 0.0);
        assert_relative_eq!(inside.distance, -0.5);
        let thick = c.nearest_point_from(Vec3::new(0.0, 5.0, 0.0), 0.5);
        assert_relative_eq!(thick.distance, 1.5);
    }

    #[test]
    fn test_sphere_uses_largest_scale_and_scaled_center() {
        let t = AffineTransform::identity().with_scale(Vec3::new(1.0, 3.0, 2.0));
        let c = Collider::new(
            ColliderShape::Sphere { radius: 0.5 },
            Vec3::new(0.0, 1.0, 0.0),
            0.1,
            t,
        );
        assert_relative_eq!(c.world_center().y, 3.0);
        let q = c.nearest_point_from(Vec3::new(5.0, 3.0, 0.0), 0.0);
        assert_relative_eq!(q.distance, 5.0 - 1.5 - 0.1, epsilon = 1e-5);
    }

    #[test]
    fn test_capsule_caps_and_side() {
        let c = Collider::capsule(0.5, 3.0, Axis::Y, AffineTransform::identity());
        // Segment spans y in [-1, 1]
        let side = c.nearest_point_from(Vec3::new(2.0, 0.5, 0.0), 0.0);
        assert_relative_eq!(side.distance, 1.5);
        assert_relative_eq!(side.point.x, 0.5);
        let cap = c.nearest_point_from(Vec3::new(0.0, 4.0, 0.0), 0.0);
        assert_relative_eq!(cap.distance, 2.5);
        assert!(c.contains(Vec3::new(0.0, 1.4, 0.0)));
        assert!(!c.contains(Vec3::new(0.0, 1.6, 0.0)));
    }

    #[test]
    fn test_box_inside_reports_minimum_penetration() {
        let c = Collider::cuboid(Vec3::new(4.0, 2.0, 6.0), AffineTransform::identity());
        let q = c.nearest_point_from(Vec3::new(1.5, 0.2, -1.0), 0.0);
        // Penetrations: x 0.5, y 0.8, z 2.0
        assert_relative_eq!(q.distance, -0.5);
        assert_relative_eq!(q.point.x, 2.0);
        let neg = c.nearest_point_from(Vec3::new(0.0, -0.9, 0.0), 0.0);
        assert_relative_eq!(neg.distance, -0.1, epsilon = 1e-6);
        assert_relative_eq!(neg.point.y, -1.0);
    }

    #[test]
    fn test_box_face_counts_as_inside() {
        let c = Collider::cuboid(Vec3::repeat(2.0), AffineTransform::identity());
        let q = c.nearest_point_from(Vec3::new(1.0, 0.3, -0.2), 0.0);
        assert_eq!(q.distance, 0.0);
        assert!(q.distance.is_sign_negative());
        assert_relative_eq!(q.point, Vec3::new(1.0, 0.3, -0.2));
        let beyond = c.nearest_point_from(Vec3::new(1.0 + 1e-3, 0.3, -0.2), 0.0);
        assert!(beyond.distance.is_sign_positive());
    }

    #[test]
    fn test_box_outside_corner_distance() {
        let c = Collider::cuboid(Vec3::repeat(2.0), AffineTransform::identity());
        let q = c.nearest_point_from(Vec3::new(2.0, 2.0, 0.0), 0.0);
        assert_relative_eq!(q.distance, 2.0_f32.sqrt());
        assert_relative_eq!(q.point, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_box_respects_rotation_and_non_uniform_scale() {
        let t = AffineTransform::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), FRAC_PI_4),
            Vec3::new(2.0, 1.0, 1.0),
        );
        let c = Collider::cuboid(Vec3::repeat(1.0), t);
        // Local x extent is 1 after scaling; probe along the rotated local x axis
        let dir = t.transform_direction(Vec3::x());
        let q = c.nearest_point_from(Vec3::new(10.0, 0.0, 0.0) + dir * 3.0, 0.0);
        assert_relative_eq!(q.distance, 2.0, epsilon = 1e-5);
        let b = c.bounds();
        assert!(b.contains(Vec3::new(10.0, 0.0, 0.0) + dir * 0.99));
    }

    #[test]
    fn test_bounds_include_contact_offset() {
        let c = Collider::new(
            ColliderShape::Sphere { radius: 1.0 },
            Vec3::zeros(),
            0.25,
            AffineTransform::identity(),
        );
        assert_relative_eq!(c.bounds().max.x, 1.25);
        assert_relative_eq!(c.bounds().min.y, -1.25);
    }
}
