use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Determinants at or below this magnitude are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// 2D affine transform.
///
/// Coefficients are `[a, b, c, d, e, f]`: scale-x, skew-y, skew-x, scale-y,
/// translate-x, translate-y. A point maps as
///
/// ```text
/// x' = a*x + c*y + e
/// y' = b*x + d*y + f
/// ```
///
/// Composition is written in application order: `t1.then(t2)` applies `t1`
/// first and `t2` second.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 6]", into = "[f64; 6]")]
pub struct Transform(Affine);

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f64; 6]> for Transform {
    fn from(coeffs: [f64; 6]) -> Self {
        Self(Affine::new(coeffs))
    }
}

impl From<Transform> for [f64; 6] {
    fn from(t: Transform) -> Self {
        t.coeffs()
    }
}

impl From<Affine> for Transform {
    fn from(a: Affine) -> Self {
        Self(a)
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform(Affine::IDENTITY);

    #[inline]
    pub const fn from_coeffs(coeffs: [f64; 6]) -> Self {
        Self(Affine::new(coeffs))
    }

    #[inline]
    pub fn coeffs(&self) -> [f64; 6] {
        self.0.as_coeffs()
    }

    #[inline]
    pub fn translate(x: f64, y: f64) -> Self {
        Self(Affine::translate((x, y)))
    }

    #[inline]
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self(Affine::scale_non_uniform(sx, sy))
    }

    #[inline]
    pub fn rotate_deg(degrees: f64) -> Self {
        Self(Affine::rotate(degrees.to_radians()))
    }

    /// Placement used by design files: rotate about the local origin, then move
    /// the origin to `(x, y)`.
    pub fn from_position_rotation(x: f64, y: f64, degrees: f64) -> Self {
        Self::rotate_deg(degrees).then(Self::translate(x, y))
    }

    /// Returns the transform that applies `self` first, then `next`.
    #[inline]
    #[must_use]
    pub fn then(self, next: Transform) -> Transform {
        Transform(next.0 * self.0)
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.coeffs().iter().all(|c| c.is_finite())
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.0 == Affine::IDENTITY
    }

    /// Inverse transform, or `DegenerateTransform` when the matrix is singular.
    pub fn try_invert(&self) -> Result<Transform, ValidationError> {
        if !self.is_finite() {
            return Err(ValidationError::NonFinite { what: "transform" });
        }
        let det = self.determinant();
        if det.abs() <= SINGULAR_EPSILON {
            return Err(ValidationError::DegenerateTransform { det });
        }
        Ok(Transform(self.0.inverse()))
    }

    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        self.0 * p
    }

    /// Axis-aligned box enclosing the four transformed corners of `rect`.
    pub fn transform_rect_bbox(&self, rect: Rect) -> Rect {
        self.0.transform_rect_bbox(rect)
    }

    #[inline]
    pub fn as_affine(&self) -> Affine {
        self.0
    }

    /// Row-major 2x3 matrix as consumed by shaders: `[[a, c, e], [b, d, f]]`.
    pub fn to_rows_f32(&self) -> [[f32; 3]; 2] {
        let [a, b, c, d, e, f] = self.coeffs();
        [
            [a as f32, c as f32, e as f32],
            [b as f32, d as f32, f as f32],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    // ── composition ───────────────────────────────────────────────────────

    #[test]
    fn then_applies_left_first() {
        let t = Transform::scale(2.0, 2.0).then(Transform::translate(10.0, 0.0));
        assert!(approx(t.apply(Point::new(1.0, 1.0)), Point::new(12.0, 2.0)));

        let u = Transform::translate(10.0, 0.0).then(Transform::scale(2.0, 2.0));
        assert!(approx(u.apply(Point::new(1.0, 1.0)), Point::new(22.0, 2.0)));
    }

    #[test]
    fn coefficient_order_matches_documentation() {
        let t = Transform::from_coeffs([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        // x' = 1*1 + 3*1 + 5, y' = 2*1 + 4*1 + 6
        assert!(approx(t.apply(Point::new(1.0, 1.0)), Point::new(9.0, 12.0)));
    }

    #[test]
    fn position_rotation_rotates_about_local_origin() {
        let t = Transform::from_position_rotation(100.0, 50.0, 90.0);
        assert!(approx(t.apply(Point::ZERO), Point::new(100.0, 50.0)));
        assert!(approx(t.apply(Point::new(10.0, 0.0)), Point::new(100.0, 60.0)));
    }

    // ── inversion ─────────────────────────────────────────────────────────

    #[test]
    fn invert_round_trips_points() {
        let t = Transform::from_position_rotation(3.0, -7.0, 33.0).then(Transform::scale(2.0, 0.5));
        let inv = t.try_invert().unwrap();
        let p = Point::new(4.0, 9.0);
        assert!(approx(inv.apply(t.apply(p)), p));
    }

    #[test]
    fn degenerate_transform_reports_error() {
        let t = Transform::scale(0.0, 1.0);
        assert!(matches!(
            t.try_invert(),
            Err(ValidationError::DegenerateTransform { .. })
        ));
    }

    #[test]
    fn non_finite_transform_reports_error() {
        let t = Transform::from_coeffs([f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0]);
        assert_eq!(
            t.try_invert(),
            Err(ValidationError::NonFinite { what: "transform" })
        );
    }

    // ── bbox / serde ──────────────────────────────────────────────────────

    #[test]
    fn rect_bbox_under_rotation_grows() {
        let t = Transform::rotate_deg(45.0);
        let bb = t.transform_rect_bbox(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(bb.width() > 14.0 && bb.width() < 14.2);
    }

    #[test]
    fn serializes_as_six_numbers() {
        let t = Transform::translate(3.0, 4.0);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[1.0,0.0,0.0,1.0,3.0,4.0]");
        let back: Transform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
