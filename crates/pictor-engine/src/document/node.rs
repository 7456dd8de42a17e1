use std::sync::Arc;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geometry::{FillRule, Geometry, StrokeStyle, Transform};
use crate::paint::{normalize_stops, Paint, PaintKind};

use super::NodeId;

/// Which paint list of a node an operation addresses.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintTarget {
    Fill,
    Stroke,
}

/// A drawable element owned by a Document.
///
/// Paint lists are ordered top-to-bottom: index 0 is the visually topmost
/// paint. Geometry and paint buffers are reference counted so snapshots share
/// them; mutations replace them copy-on-write.
#[derive(Debug, Clone)]
pub struct Node {
    pub(super) id: NodeId,
    pub(super) name: String,
    pub(super) geometry: Arc<Geometry>,
    pub(super) transform: Transform,
    pub(super) fills: Arc<Vec<Paint>>,
    pub(super) strokes: Arc<Vec<Paint>>,
    pub(super) stroke: StrokeStyle,
    pub(super) fill_rule: FillRule,
    pub(super) opacity: f32,
    pub(super) visible: bool,
    pub(super) bounds: Rect,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn fills(&self) -> &Arc<Vec<Paint>> {
        &self.fills
    }

    pub fn strokes(&self) -> &Arc<Vec<Paint>> {
        &self.strokes
    }

    pub fn paints(&self, target: PaintTarget) -> &Arc<Vec<Paint>> {
        match target {
            PaintTarget::Fill => &self.fills,
            PaintTarget::Stroke => &self.strokes,
        }
    }

    /// Swaps in a new paint list. Stroke presence feeds the bounds, so they are refreshed.
    pub(super) fn set_paint_list(&mut self, target: PaintTarget, paints: Vec<Paint>) {
        match target {
            PaintTarget::Fill => self.fills = Arc::new(paints),
            PaintTarget::Stroke => self.strokes = Arc::new(paints),
        }
        self.recompute_bounds();
    }

    pub fn stroke(&self) -> StrokeStyle {
        self.stroke
    }

    pub fn fill_rule(&self) -> FillRule {
        self.fill_rule
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// World-space bounding box, derived from geometry, transform and stroke.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub(super) fn recompute_bounds(&mut self) {
        self.bounds = compute_bounds(&self.geometry, self.transform, !self.strokes.is_empty(), self.stroke);
    }

    /// Precise hit test of a world-space point against fill geometry and stroke outline.
    pub fn hit(&self, p: Point) -> bool {
        let Ok(inverse) = self.transform.try_invert() else {
            return false;
        };
        let local = inverse.apply(p);
        if !self.fills.is_empty() && self.geometry.contains(local, self.fill_rule) {
            return true;
        }
        if !self.strokes.is_empty() && self.stroke.width > 0.0 {
            let outline = self.stroke.outline(&self.geometry.to_path(0.1), 0.1);
            return kurbo::Shape::winding(&outline, local) != 0;
        }
        false
    }
}

pub(super) fn compute_bounds(geometry: &Geometry, transform: Transform, stroked: bool, stroke: StrokeStyle) -> Rect {
    let mut local = geometry.local_bounds();
    if stroked {
        let d = stroke.outset();
        local = local.inflate(d, d);
    }
    transform.transform_rect_bbox(local)
}

/// Validates a paint for storage: gradient stops are normalized in place and
/// opacity is clamped. Gradients that cannot keep 2 stops are rejected.
pub(crate) fn prepare_paint(mut paint: Paint) -> Result<Paint, ValidationError> {
    if !paint.opacity.is_finite() {
        return Err(ValidationError::NonFinite { what: "paint opacity" });
    }
    paint.opacity = paint.opacity.clamp(0.0, 1.0);
    match &mut paint.kind {
        PaintKind::Solid { .. } => {}
        PaintKind::LinearGradient(g) | PaintKind::RadialGradient(g) => {
            if !g.transform.is_finite() {
                return Err(ValidationError::NonFinite { what: "gradient transform" });
            }
            g.stops = normalize_stops(&g.stops)?;
        }
    }
    Ok(paint)
}

pub(crate) fn prepare_paints(paints: Vec<Paint>) -> Result<Vec<Paint>, ValidationError> {
    paints.into_iter().map(prepare_paint).collect()
}

/// Description of a node to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub fills: Vec<Paint>,
    #[serde(default)]
    pub strokes: Vec<Paint>,
    #[serde(default)]
    pub stroke: StrokeStyle,
    #[serde(default)]
    pub fill_rule: FillRule,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    /// Insert position in z-order; `None` places the node on top.
    #[serde(default)]
    pub z: Option<usize>,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl NodeSpec {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: None,
            name: String::new(),
            geometry,
            transform: Transform::IDENTITY,
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke: StrokeStyle::default(),
            fill_rule: FillRule::NonZero,
            opacity: 1.0,
            visible: true,
            z: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn with_fill(mut self, paint: Paint) -> Self {
        self.fills.push(paint);
        self
    }

    #[must_use]
    pub fn with_fills(mut self, paints: Vec<Paint>) -> Self {
        self.fills = paints;
        self
    }

    #[must_use]
    pub fn with_stroke(mut self, paint: Paint, style: StrokeStyle) -> Self {
        self.strokes.push(paint);
        self.stroke = style;
        self
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    #[must_use]
    pub fn at_z(mut self, z: usize) -> Self {
        self.z = Some(z);
        self
    }

    pub(super) fn into_node(self, id: NodeId) -> Result<Node, ValidationError> {
        self.geometry.validate()?;
        if !self.transform.is_finite() {
            return Err(ValidationError::NonFinite { what: "node transform" });
        }
        if !self.opacity.is_finite() {
            return Err(ValidationError::NonFinite { what: "node opacity" });
        }
        validate_stroke(&self.stroke)?;

        let mut node = Node {
            id,
            name: self.name,
            geometry: Arc::new(self.geometry),
            transform: self.transform,
            fills: Arc::new(prepare_paints(self.fills)?),
            strokes: Arc::new(prepare_paints(self.strokes)?),
            stroke: self.stroke,
            fill_rule: self.fill_rule,
            opacity: self.opacity.clamp(0.0, 1.0),
            visible: self.visible,
            bounds: Rect::ZERO,
        };
        node.recompute_bounds();
        Ok(node)
    }
}

pub(super) fn validate_stroke(stroke: &StrokeStyle) -> Result<(), ValidationError> {
    if !stroke.width.is_finite() || !stroke.miter_limit.is_finite() {
        return Err(ValidationError::NonFinite { what: "stroke style" });
    }
    if stroke.width < 0.0 {
        return Err(ValidationError::InvalidGeometry {
            reason: format!("negative stroke width {}", stroke.width),
        });
    }
    Ok(())
}

/// Partial update of node properties; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub geometry: Option<Geometry>,
    pub transform: Option<Transform>,
    pub stroke: Option<StrokeStyle>,
    pub fill_rule: Option<FillRule>,
    pub opacity: Option<f32>,
    pub visible: Option<bool>,
}

impl NodeUpdate {
    pub fn transform(transform: Transform) -> Self {
        Self {
            transform: Some(transform),
            ..Self::default()
        }
    }

    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::default()
        }
    }

    /// True when the update can change the node's bounding box.
    pub fn touches_bounds(&self) -> bool {
        self.geometry.is_some() || self.transform.is_some() || self.stroke.is_some()
    }
}
