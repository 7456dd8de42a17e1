use kurbo::{BezPath, PathEl, Point, Rect};

use crate::geometry::Transform;

use super::stream::FlatPath;

/// Transforms `path` into device space and flattens it to polylines.
///
/// `tolerance` is in device pixels. Open subpaths are closed implicitly, which
/// is how fills treat them.
pub fn flatten(path: &BezPath, to_device: Transform, tolerance: f64) -> FlatPath {
    let device = to_device.as_affine() * path.clone();

    let mut contours: Vec<Vec<[f32; 2]>> = Vec::new();
    let mut current: Vec<[f32; 2]> = Vec::new();
    let mut bounds: Option<Rect> = None;

    let mut push = |current: &mut Vec<[f32; 2]>, p: Point| {
        bounds = Some(match bounds {
            Some(b) => b.union_pt(p),
            None => Rect::from_points(p, p),
        });
        current.push([p.x as f32, p.y as f32]);
    };

    kurbo::flatten(device.iter(), tolerance.max(1e-3), |el| match el {
        PathEl::MoveTo(p) => {
            if current.len() >= 3 {
                contours.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
            push(&mut current, p);
        }
        PathEl::LineTo(p) => push(&mut current, p),
        PathEl::ClosePath => {
            if current.len() >= 3 {
                contours.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        // flatten only emits lines
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    if current.len() >= 3 {
        contours.push(current);
    }

    FlatPath {
        contours,
        bounds: bounds.unwrap_or(Rect::ZERO),
    }
}

/// Tolerance in local units giving roughly `device_tolerance` pixels after `to_device`.
pub fn local_tolerance(to_device: Transform, device_tolerance: f64) -> f64 {
    let scale = to_device.determinant().abs().sqrt();
    if scale > 1e-9 {
        device_tolerance / scale
    } else {
        device_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Circle, Shape};

    #[test]
    fn rectangle_keeps_its_corners() {
        let path = Rect::new(0.0, 0.0, 10.0, 20.0).to_path(0.1);
        let flat = flatten(&path, Transform::translate(5.0, 5.0), 0.25);
        assert_eq!(flat.contours.len(), 1);
        assert_eq!(flat.bounds, Rect::new(5.0, 5.0, 15.0, 25.0));
        assert!(flat.contours[0].contains(&[15.0, 25.0]));
    }

    #[test]
    fn curves_stay_within_tolerance() {
        let path = Circle::new((0.0, 0.0), 100.0).to_path(0.01);
        let flat = flatten(&path, Transform::IDENTITY, 0.25);
        assert!(flat.vertex_count() > 16);
        for p in &flat.contours[0] {
            let r = f64::from(p[0]).hypot(f64::from(p[1]));
            assert!((r - 100.0).abs() < 0.5, "radius {r}");
        }
    }

    #[test]
    fn degenerate_subpaths_are_dropped() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((5.0, 0.0));
        path.close_path();
        let flat = flatten(&path, Transform::IDENTITY, 0.25);
        assert!(flat.is_empty());
    }

    #[test]
    fn zoom_tightens_local_tolerance() {
        assert_eq!(local_tolerance(Transform::scale(4.0, 4.0), 0.25), 0.0625);
    }
}
