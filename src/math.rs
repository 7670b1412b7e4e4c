//! Robust determinants and small geometric helpers shared by both engines.

use glam::Vec3;

/// Determinants whose absolute value falls at or below this bound are
/// snapped to zero: otherwise Lawson-flip optimization can cycle on points
/// that are exactly coplanar up to floating-point noise.
const DET_EPSILON: f32 = f32::EPSILON;

/// Scalar triple product of three row vectors, using the left-handed sign
/// convention carried over from the original determinant routine:
/// `m[2]m[4]m[6] + m[0]m[5]m[7] + m[1]m[3]m[8] - m[0]m[4]m[8] -
/// m[1]m[5]m[6] - m[2]m[3]m[7]` where `m` is the row-major flattening of
/// `(row0, row1, row2)`.
pub(crate) fn signed_volume(row0: Vec3, row1: Vec3, row2: Vec3) -> f32 {
    let m = [
        row0.x, row0.y, row0.z, row1.x, row1.y, row1.z, row2.x, row2.y, row2.z,
    ];

    let det = m[2] * m[4] * m[6] + m[0] * m[5] * m[7] + m[1] * m[3] * m[8]
        - m[0] * m[4] * m[8]
        - m[1] * m[5] * m[6]
        - m[2] * m[3] * m[7];

    if det.abs() <= DET_EPSILON { 0.0 } else { det }
}

/// Computes the circumcenter of the triangle `(a, b, c)`, lifted along the
/// triangle's normal so that it sits at distance `radius` from all three
/// vertices. Returns `None` when the triangle's circumradius exceeds
/// `radius` (no such ball exists).
///
/// From <https://gamedev.stackexchange.com/questions/60630/how-do-i-find-the-circumcenter-of-a-triangle-in-3d>.
#[must_use]
pub(crate) fn ball_center(a: Vec3, b: Vec3, c: Vec3, radius: f32) -> Option<Vec3> {
    let ac = c - a;
    let ab = b - a;
    let ab_cross_ac = ab.cross(ac);

    let denom = 2.0 * ab_cross_ac.dot(ab_cross_ac);
    if denom == 0.0 {
        return None;
    }

    let to_circumcenter =
        (ab_cross_ac.cross(ab) * ac.dot(ac) + ac.cross(ab_cross_ac) * ab.dot(ab)) / denom;

    let circumcenter = a + to_circumcenter;

    let height_squared = radius.mul_add(radius, -to_circumcenter.dot(to_circumcenter));
    if height_squared.is_sign_negative() {
        return None;
    }

    let normal = ab_cross_ac.normalize();
    Some(circumcenter + normal * height_squared.sqrt())
}

/// Geometric normal of the triangle `(a, b, c)` by the right-hand rule.
#[must_use]
pub(crate) fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signed_volume_snaps_small_values_to_zero() {
        let v = signed_volume(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        );
        assert_eq!(v, 0.0);
    }

    #[test]
    fn ball_center_isosceles() {
        let center = ball_center(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            10.0,
        );
        assert_eq!(center, Some(Vec3::new(5.0, 5.0, 7.071_068)));
    }

    #[test]
    fn ball_center_radius_too_small_is_none() {
        let center = ball_center(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 10.0, 0.0),
            1.0,
        );
        assert_eq!(center, None);
    }
}
