//! Sphere tracing against a single collider and vertical occupancy probes.

use crate::core_types::Vec3;

use super::shape::Collider;

/// Distance below which a march counts as touching the surface.
pub const DEFAULT_THRESHOLD: f32 = 0.01;

/// Numeric code of [`RaymarchOutcome::Inside`].
pub const INSIDE_CODE: f32 = -1.0;

/// Numeric code of [`RaymarchOutcome::Behind`].
pub const BEHIND_CODE: f32 = f32::MIN;

/// Steps after which a still-shrinking march is reported as a miss.
const MAX_STEPS: usize = 256;

/// How a march ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RaymarchOutcome {
    /// The origin is already within the threshold. No step was taken.
    Inside,
    /// The nearest surface point lies opposite the ray direction.
    Behind,
    /// The march reached the surface after travelling `traveled`.
    Hit { point: Vec3, traveled: f32 },
    /// Distance estimates stopped shrinking at `closest` without touching.
    Miss {
        closest: f32,
        point: Vec3,
        traveled: f32,
    },
}

impl RaymarchOutcome {
    /// `-1` inside, `f32::MIN` behind, `0` on hit, the closest distance on miss.
    pub fn code(&self) -> f32 {
        match *self {
            RaymarchOutcome::Inside => INSIDE_CODE,
            RaymarchOutcome::Behind => BEHIND_CODE,
            RaymarchOutcome::Hit { .. } => 0.0,
            RaymarchOutcome::Miss { closest, .. } => closest,
        }
    }

    /// Distance marched before touching. Zero unless the march hit.
    pub fn hit_distance(&self) -> f32 {
        match *self {
            RaymarchOutcome::Hit { traveled, .. } => traveled,
            _ => 0.0,
        }
    }

    /// Distance marched in total, including a missed march.
    pub fn traveled(&self) -> f32 {
        match *self {
            RaymarchOutcome::Hit { traveled, .. } | RaymarchOutcome::Miss { traveled, .. } => {
                traveled
            }
            RaymarchOutcome::Inside | RaymarchOutcome::Behind => 0.0,
        }
    }
}

/// Marches from `origin` along the unit vector `direction` toward `collider`
/// thickened by `thickness`.
pub fn raymarch(
    origin: Vec3,
    direction: Vec3,
    collider: &Collider,
    thickness: f32,
    threshold: f32,
) -> RaymarchOutcome {
    let first = collider.nearest_point_from(origin, thickness);
    if first.distance <= threshold {
        return RaymarchOutcome::Inside;
    }
    if (first.point - origin).dot(&direction) < 0.0 {
        return RaymarchOutcome::Behind;
    }

    let mut position = origin;
    let mut traveled = 0.0;
    let mut next = first.distance;
    let mut min_step = f32::MAX;
    let mut steps = 0;

    while next < min_step && steps < MAX_STEPS {
        min_step = next;
        position += direction * next;
        traveled += next;
        steps += 1;

        next = collider.nearest_point_from(position, thickness).distance;
        if next < threshold {
            return RaymarchOutcome::Hit {
                point: position,
                traveled,
            };
        }
    }

    RaymarchOutcome::Miss {
        closest: min_step.min(next),
        point: position,
        traveled,
    }
}

/// Collider extent along one vertical detection column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnOccupancy {
    /// Length of the column inside the collider, world units
    pub occupancy: f32,
    /// Distance from the probe's bottom origin to the lowest occupied point
    pub distance: f32,
}

/// Measures how much of the column `[bottom, bottom + up·depth]` is inside
/// `collider`.
///
/// The column is extended by `border` at both ends and marched against the
/// collider thickened by `border`, so a column that only grazes the object
/// still reports a partial occupancy. The weight of that partial hit is
/// `clamp(1 − miss / border, 0, 1)`, where `miss` is the horizontal distance
/// left by an unthickened march from the thickened entry point. `border` must
/// be positive.
///
/// Returns `None` when the column does not touch the thickened collider.
pub fn column_occupancy(
    collider: &Collider,
    bottom: Vec3,
    up: Vec3,
    depth: f32,
    border: f32,
) -> Option<ColumnOccupancy> {
    let bottom = bottom - up * border;
    let depth = depth + 2.0 * border;

    let from_bottom = raymarch(bottom, up, collider, border, DEFAULT_THRESHOLD);
    let entry_distance = match from_bottom {
        RaymarchOutcome::Behind | RaymarchOutcome::Miss { .. } => return None,
        RaymarchOutcome::Inside => 0.0,
        RaymarchOutcome::Hit { traveled, .. } => traveled,
    };
    if entry_distance > depth {
        return None;
    }
    let entry = match from_bottom {
        RaymarchOutcome::Hit { point, .. } => point,
        _ => bottom,
    };

    let miss = raymarch(entry, up, collider, 0.0, DEFAULT_THRESHOLD).code();
    let weight = (1.0 - miss / border).clamp(0.0, 1.0);

    let top = bottom + up * depth;
    let from_top = raymarch(top, -up, collider, border, DEFAULT_THRESHOLD);

    let below = (entry_distance - border).max(0.0);
    let above = (from_top.traveled() - border).max(0.0);
    let full = depth - 2.0 * border - below - above;
    let occupancy = weight * full;

    Some(ColumnOccupancy {
        occupancy,
        distance: entry_distance + (full - occupancy) * 0.5 - border,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collider::shape::ColliderShape;
    use crate::core_types::AffineTransform;
    use approx::assert_relative_eq;

    fn unit_sphere_at(center: Vec3) -> Collider {
        Collider::sphere(1.0, AffineTransform::from_translation(center))
    }

    #[test]
    fn test_hit_sphere_head_on() {
        let c = unit_sphere_at(Vec3::zeros());
        let outcome = raymarch(Vec3::new(0.0, 0.0, -5.0), Vec3::z(), &c, 0.0, DEFAULT_THRESHOLD);
        match outcome {
            RaymarchOutcome::Hit { point, traveled } => {
                assert_relative_eq!(traveled, 4.0, epsilon = 1e-4);
                assert_relative_eq!(point.z, -1.0, epsilon = 1e-4);
            }
            other => panic!("expected hit, got {other:?}"),
        }
        assert_eq!(outcome.code(), 0.0);
    }

    #[test]
    fn test_inside_does_not_advance() {
        let c = unit_sphere_at(Vec3::zeros());
        let outcome = raymarch(Vec3::new(0.0, 0.5, 0.0), Vec3::y(), &c, 0.0, DEFAULT_THRESHOLD);
        assert_eq!(outcome, RaymarchOutcome::Inside);
        assert_eq!(outcome.code(), INSIDE_CODE);
        assert_eq!(outcome.hit_distance(), 0.0);
    }

    #[test]
    fn test_behind_returns_sentinel() {
        let c = unit_sphere_at(Vec3::zeros());
        let outcome = raymarch(Vec3::new(0.0, 3.0, 0.0), Vec3::y(), &c, 0.0, DEFAULT_THRESHOLD);
        assert_eq!(outcome, RaymarchOutcome::Behind);
        assert_eq!(outcome.code(), f32::MIN);
    }

    #[test]
    fn test_grazing_ray_misses_with_closest_distance() {
        let c = unit_sphere_at(Vec3::zeros());
        let outcome = raymarch(
            Vec3::new(1.5, -5.0, 0.0),
            Vec3::y(),
            &c,
            0.0,
            DEFAULT_THRESHOLD,
        );
        match outcome {
            RaymarchOutcome::Miss { closest, .. } => {
                assert!(closest > 0.5 && closest < 0.55, "closest {closest}");
            }
            other => panic!("expected miss, got {other:?}"),
        }
        assert!(outcome.code() > 0.0);
    }

    #[test]
    fn test_thickness_moves_the_hit() {
        let c = unit_sphere_at(Vec3::zeros());
        let outcome = raymarch(Vec3::new(-6.0, 0.0, 0.0), Vec3::x(), &c, 1.0, DEFAULT_THRESHOLD);
        assert_relative_eq!(outcome.hit_distance(), 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_column_through_sphere_center() {
        let c = unit_sphere_at(Vec3::zeros());
        let column = column_occupancy(&c, Vec3::new(0.0, -5.0, 0.0), Vec3::y(), 10.0, 0.5).unwrap();
        // The border thickens the sphere to [-1.5, 1.5] along the column
        assert_relative_eq!(column.occupancy, 3.0, epsilon = 1e-3);
        assert_relative_eq!(column.distance, 3.5, epsilon = 1e-3);
    }

    #[test]
    fn test_column_clipped_by_detection_top() {
        let c = unit_sphere_at(Vec3::zeros());
        let column = column_occupancy(&c, Vec3::new(0.0, -5.0, 0.0), Vec3::y(), 5.0, 1.0).unwrap();
        // Column spans [-6, 1]; the thickened sphere already reaches its top
        assert_relative_eq!(column.occupancy, 2.0, epsilon = 1e-3);
    }

    #[test]
    fn test_column_beside_collider_is_empty() {
        let c = unit_sphere_at(Vec3::zeros());
        assert!(column_occupancy(&c, Vec3::new(3.0, -5.0, 0.0), Vec3::y(), 10.0, 0.5).is_none());
    }

    #[test]
    fn test_column_at_edge_is_partial() {
        let c = Collider::new(
            ColliderShape::Box {
                size: Vec3::repeat(2.0),
            },
            Vec3::zeros(),
            0.0,
            AffineTransform::identity(),
        );
        let inside = column_occupancy(&c, Vec3::new(0.0, -5.0, 0.0), Vec3::y(), 10.0, 0.5).unwrap();
        let edge = column_occupancy(&c, Vec3::new(1.25, -5.0, 0.0), Vec3::y(), 10.0, 0.5).unwrap();
        assert_relative_eq!(inside.occupancy, 3.0, epsilon = 1e-3);
        assert!(edge.occupancy > 0.0 && edge.occupancy < inside.occupancy);
    }

    #[test]
    fn test_column_below_detection_depth_is_empty() {
        let c = unit_sphere_at(Vec3::new(0.0, 20.0, 0.0));
        assert!(column_occupancy(&c, Vec3::new(0.0, -5.0, 0.0), Vec3::y(), 5.0, 0.5).is_none());
    }
}
