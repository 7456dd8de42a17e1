use std::f64::consts::{FRAC_PI_2, TAU};

use kurbo::{BezPath, Point, Rect, RoundedRect, RoundedRectRadii, Shape};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::FillRule;

/// Per-corner radii for a rectangle (local units).
///
/// Corners follow CSS convention: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerRadii {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

impl CornerRadii {
    #[inline]
    pub const fn all(r: f64) -> Self {
        Self {
            top_left: r,
            top_right: r,
            bottom_right: r,
            bottom_left: r,
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.top_left <= 0.0
            && self.top_right <= 0.0
            && self.bottom_right <= 0.0
            && self.bottom_left <= 0.0
    }

    fn to_kurbo(self) -> RoundedRectRadii {
        RoundedRectRadii::new(
            self.top_left.max(0.0),
            self.top_right.max(0.0),
            self.bottom_right.max(0.0),
            self.bottom_left.max(0.0),
        )
    }
}

/// Node geometry in node-local coordinates.
///
/// Primitives occupy the box `(0, 0)..(width, height)`; the node transform
/// places that box in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Rect {
        width: f64,
        height: f64,
        #[serde(default)]
        corner_radius: CornerRadii,
    },
    Ellipse {
        width: f64,
        height: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
    RegularPolygon {
        width: f64,
        height: f64,
        point_count: u32,
    },
    Star {
        width: f64,
        height: f64,
        point_count: u32,
        /// Inner vertex distance as a fraction of the outer radius.
        inner_radius: f64,
    },
    Path {
        path: BezPath,
    },
}

impl Geometry {
    pub fn rect(width: f64, height: f64) -> Self {
        Geometry::Rect {
            width,
            height,
            corner_radius: CornerRadii::default(),
        }
    }

    pub fn ellipse(width: f64, height: f64) -> Self {
        Geometry::Ellipse { width, height }
    }

    pub fn path(path: BezPath) -> Self {
        Geometry::Path { path }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        fn size(w: f64, h: f64) -> Result<(), ValidationError> {
            if !w.is_finite() || !h.is_finite() {
                return Err(ValidationError::NonFinite { what: "geometry size" });
            }
            if w < 0.0 || h < 0.0 {
                return Err(ValidationError::InvalidGeometry {
                    reason: format!("negative size {w}x{h}"),
                });
            }
            Ok(())
        }

        fn count(n: u32) -> Result<(), ValidationError> {
            if n < 3 {
                return Err(ValidationError::InvalidGeometry {
                    reason: format!("polygon needs at least 3 points, got {n}"),
                });
            }
            Ok(())
        }

        match self {
            Geometry::Rect { width, height, corner_radius } => {
                size(*width, *height)?;
                let r = corner_radius;
                if ![r.top_left, r.top_right, r.bottom_right, r.bottom_left]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return Err(ValidationError::NonFinite { what: "corner radius" });
                }
                Ok(())
            }
            Geometry::Ellipse { width, height } => size(*width, *height),
            Geometry::Polygon { points } => {
                if points.len() < 3 {
                    return Err(ValidationError::InvalidGeometry {
                        reason: format!("polygon needs at least 3 points, got {}", points.len()),
                    });
                }
                if !points.iter().all(|p| p.is_finite()) {
                    return Err(ValidationError::NonFinite { what: "polygon point" });
                }
                Ok(())
            }
            Geometry::RegularPolygon { width, height, point_count } => {
                size(*width, *height)?;
                count(*point_count)
            }
            Geometry::Star { width, height, point_count, inner_radius } => {
                size(*width, *height)?;
                count(*point_count)?;
                if !inner_radius.is_finite() || *inner_radius < 0.0 {
                    return Err(ValidationError::InvalidGeometry {
                        reason: format!("star inner radius {inner_radius}"),
                    });
                }
                Ok(())
            }
            Geometry::Path { path } => {
                if path.elements().is_empty() {
                    return Err(ValidationError::InvalidGeometry {
                        reason: "empty path".to_string(),
                    });
                }
                let bb = path.bounding_box();
                if !bb.x0.is_finite() || !bb.y0.is_finite() || !bb.x1.is_finite() || !bb.y1.is_finite() {
                    return Err(ValidationError::NonFinite { what: "path" });
                }
                Ok(())
            }
        }
    }

    /// Outline as a Bézier path. `tolerance` only affects curved primitives.
    pub fn to_path(&self, tolerance: f64) -> BezPath {
        match self {
            Geometry::Rect { width, height, corner_radius } => {
                let rect = Rect::new(0.0, 0.0, *width, *height);
                if corner_radius.is_zero() {
                    rect.to_path(tolerance)
                } else {
                    RoundedRect::from_rect(rect, corner_radius.to_kurbo()).to_path(tolerance)
                }
            }
            Geometry::Ellipse { width, height } => {
                kurbo::Ellipse::from_rect(Rect::new(0.0, 0.0, *width, *height)).to_path(tolerance)
            }
            Geometry::Polygon { points } => polyline_path(points.iter().copied()),
            Geometry::RegularPolygon { width, height, point_count } => {
                polyline_path(regular_polygon_points(*width, *height, *point_count))
            }
            Geometry::Star { width, height, point_count, inner_radius } => {
                polyline_path(star_points(*width, *height, *point_count, *inner_radius))
            }
            Geometry::Path { path } => path.clone(),
        }
    }

    /// Bounds in node-local coordinates.
    pub fn local_bounds(&self) -> Rect {
        match self {
            Geometry::Rect { width, height, .. }
            | Geometry::Ellipse { width, height }
            | Geometry::RegularPolygon { width, height, .. }
            | Geometry::Star { width, height, .. } => Rect::new(0.0, 0.0, *width, *height),
            Geometry::Polygon { points } => points
                .iter()
                .map(|p| Rect::from_points(*p, *p))
                .reduce(|a, b| a.union(b))
                .unwrap_or(Rect::ZERO),
            Geometry::Path { path } => path.bounding_box(),
        }
    }

    /// Precise containment of a node-local point.
    pub fn contains(&self, p: Point, fill_rule: FillRule) -> bool {
        match self {
            Geometry::Rect { width, height, corner_radius } if corner_radius.is_zero() => {
                p.x >= 0.0 && p.y >= 0.0 && p.x <= *width && p.y <= *height
            }
            Geometry::Ellipse { width, height } => {
                let (rx, ry) = (width / 2.0, height / 2.0);
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (p.x - rx) / rx;
                let dy = (p.y - ry) / ry;
                dx * dx + dy * dy <= 1.0
            }
            _ => {
                let winding = self.to_path(0.1).winding(p);
                match fill_rule {
                    FillRule::NonZero => winding != 0,
                    FillRule::EvenOdd => winding % 2 != 0,
                }
            }
        }
    }
}

fn polyline_path(points: impl IntoIterator<Item = Point>) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.into_iter();
    if let Some(first) = iter.next() {
        path.move_to(first);
        for p in iter {
            path.line_to(p);
        }
        path.close_path();
    }
    path
}

/// Vertices on the ellipse inscribed in the box, first vertex at the top.
fn regular_polygon_points(width: f64, height: f64, n: u32) -> impl Iterator<Item = Point> {
    let (cx, cy) = (width / 2.0, height / 2.0);
    (0..n).map(move |i| {
        let angle = -FRAC_PI_2 + TAU * f64::from(i) / f64::from(n);
        Point::new(cx + cx * angle.cos(), cy + cy * angle.sin())
    })
}

fn star_points(width: f64, height: f64, n: u32, inner: f64) -> impl Iterator<Item = Point> {
    let (cx, cy) = (width / 2.0, height / 2.0);
    (0..n * 2).map(move |i| {
        let angle = -FRAC_PI_2 + TAU * f64::from(i) / f64::from(n * 2);
        let k = if i % 2 == 0 { 1.0 } else { inner };
        Point::new(cx + cx * k * angle.cos(), cy + cy * k * angle.sin())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_edges_and_rejects_outside() {
        let g = Geometry::rect(10.0, 5.0);
        assert!(g.contains(Point::new(0.0, 0.0), FillRule::NonZero));
        assert!(g.contains(Point::new(10.0, 5.0), FillRule::NonZero));
        assert!(!g.contains(Point::new(10.5, 2.0), FillRule::NonZero));
    }

    #[test]
    fn ellipse_corner_is_outside() {
        let g = Geometry::ellipse(10.0, 10.0);
        assert!(g.contains(Point::new(5.0, 5.0), FillRule::NonZero));
        assert!(!g.contains(Point::new(0.5, 0.5), FillRule::NonZero));
    }

    #[test]
    fn rounded_rect_corner_is_outside() {
        let g = Geometry::Rect {
            width: 20.0,
            height: 20.0,
            corner_radius: CornerRadii::all(8.0),
        };
        assert!(!g.contains(Point::new(0.5, 0.5), FillRule::NonZero));
        assert!(g.contains(Point::new(10.0, 10.0), FillRule::NonZero));
    }

    #[test]
    fn regular_polygon_first_vertex_is_top_center() {
        let g = Geometry::RegularPolygon { width: 10.0, height: 10.0, point_count: 3 };
        let path = g.to_path(0.1);
        let first = path.elements()[0];
        match first {
            kurbo::PathEl::MoveTo(p) => {
                assert!((p.x - 5.0).abs() < 1e-9 && p.y.abs() < 1e-9);
            }
            other => panic!("unexpected first element {other:?}"),
        }
    }

    #[test]
    fn star_has_twice_the_vertices() {
        let g = Geometry::Star { width: 10.0, height: 10.0, point_count: 5, inner_radius: 0.4 };
        let lines = g
            .to_path(0.1)
            .elements()
            .iter()
            .filter(|e| matches!(e, kurbo::PathEl::LineTo(_)))
            .count();
        assert_eq!(lines, 9);
        assert!(g.contains(Point::new(5.0, 5.0), FillRule::NonZero));
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        assert!(Geometry::rect(-1.0, 2.0).validate().is_err());
        assert!(Geometry::rect(f64::NAN, 2.0).validate().is_err());
        assert!(Geometry::RegularPolygon { width: 1.0, height: 1.0, point_count: 2 }.validate().is_err());
        assert!(Geometry::path(BezPath::new()).validate().is_err());
        assert!(Geometry::ellipse(0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn evenodd_hole_is_not_contained() {
        let mut path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        path.extend(Rect::new(2.0, 2.0, 8.0, 8.0).to_path(0.1));
        let g = Geometry::path(path);
        assert!(!g.contains(Point::new(5.0, 5.0), FillRule::EvenOdd));
        assert!(g.contains(Point::new(1.0, 1.0), FillRule::EvenOdd));
    }
}
