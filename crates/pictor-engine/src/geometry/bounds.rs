//! Closed-interval helpers over `kurbo::Rect`.
//!
//! Bounding boxes touch-intersect: two boxes sharing only an edge intersect,
//! and a point on a box edge is contained. Queries may over-approximate but
//! must never miss a true intersection.

use kurbo::{Point, Rect};

#[inline]
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    let (a, b) = (a.abs(), b.abs());
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

#[inline]
pub fn rect_contains_point(r: Rect, p: Point) -> bool {
    let r = r.abs();
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

#[inline]
pub fn rect_is_finite(r: Rect) -> bool {
    r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()
}

/// Union of all rects, or `None` for an empty iterator.
pub fn union_all(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// `[x0, y0, x1, y1]`, the layout used in error reports.
#[inline]
pub fn rect_coords(r: Rect) -> [f64; 4] {
    [r.x0, r.y0, r.x1, r.y1]
}
