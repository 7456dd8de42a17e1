use std::sync::Arc;

use kurbo::Rect;

use crate::document::{NodeId, PaintTarget};
use crate::geometry::{FillRule, Transform};
use crate::paint::{Color, PaintId};

use super::ramp::GradientRamp;

/// The document region shown on a surface and the surface's pixel size.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    /// Visible region in document coordinates.
    pub region: Rect,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// A viewport showing document coordinates 1:1 from the origin.
    pub fn pixels(width: u32, height: u32) -> Self {
        Self {
            region: Rect::new(0.0, 0.0, f64::from(width), f64::from(height)),
            width,
            height,
        }
    }

    /// Document to device-pixel transform.
    pub fn to_device(&self) -> Transform {
        let r = self.region;
        let sx = if r.width() > 0.0 { f64::from(self.width) / r.width() } else { 1.0 };
        let sy = if r.height() > 0.0 { f64::from(self.height) / r.height() } else { 1.0 };
        Transform::translate(-r.x0, -r.y0).then(Transform::scale(sx, sy))
    }

    /// Average linear scale from document units to pixels.
    pub fn zoom(&self) -> f64 {
        self.to_device().determinant().abs().sqrt()
    }
}

/// Polyline outline in device pixels; every contour is implicitly closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatPath {
    pub contours: Vec<Vec<[f32; 2]>>,
    pub bounds: Rect,
}

impl FlatPath {
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(|c| c.len() < 3)
    }

    pub fn vertex_count(&self) -> usize {
        self.contours.iter().map(Vec::len).sum()
    }
}

/// A paint ready for a backend: colors, ramps and device-space transforms.
#[derive(Debug, Clone, PartialEq)]
pub enum Shading {
    Solid(Color),
    Linear(GradientShading),
    Radial(GradientShading),
}

/// Gradient placement in device space.
///
/// `to_device` maps gradient space (unit line / unit circle) into device
/// pixels; `from_device` is its inverse, which fragment shaders evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientShading {
    pub ramp: Arc<GradientRamp>,
    pub to_device: Transform,
    pub from_device: Transform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaint {
    /// Paint opacity times node opacity.
    pub opacity: f32,
    pub shading: Shading,
}

/// One paint applied to one outline.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPass {
    pub paint: PaintId,
    pub target: PaintTarget,
    pub path: Arc<FlatPath>,
    pub fill_rule: FillRule,
    pub resolved: ResolvedPaint,
}

/// Everything needed to draw one node.
///
/// Passes run in order: fills bottom-up (the last fill in the node's list
/// first), then strokes bottom-up.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub z: usize,
    pub bounds: Rect,
    pub passes: Vec<DrawPass>,
}

/// Backend-agnostic draw commands for one frame, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawStream {
    pub revision: u64,
    pub viewport: Viewport,
    pub clear: Color,
    pub items: Vec<DrawItem>,
}

impl DrawStream {
    pub fn empty(viewport: Viewport, clear: Color) -> Self {
        Self {
            revision: 0,
            viewport,
            clear,
            items: Vec::new(),
        }
    }

    pub fn passes(&self) -> impl Iterator<Item = (&DrawItem, &DrawPass)> {
        self.items
            .iter()
            .flat_map(|item| item.passes.iter().map(move |pass| (item, pass)))
    }

    pub fn pass_count(&self) -> usize {
        self.items.iter().map(|i| i.passes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn device_transform_maps_region_to_pixels() {
        let vp = Viewport {
            region: Rect::new(100.0, 50.0, 300.0, 150.0),
            width: 400,
            height: 200,
        };
        let t = vp.to_device();
        assert_eq!(t.apply(Point::new(100.0, 50.0)), Point::new(0.0, 0.0));
        assert_eq!(t.apply(Point::new(300.0, 150.0)), Point::new(400.0, 200.0));
        assert!((vp.zoom() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_viewport_is_identity() {
        assert!(Viewport::pixels(640, 480).to_device().is_identity());
    }
}
