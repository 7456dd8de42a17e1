use std::sync::Arc;

use kurbo::Rect;

use crate::geometry::{FillRule, Geometry, StrokeStyle, Transform};
use crate::paint::Paint;

use super::dirty::DirtySet;
use super::node::Node;
use super::NodeId;

/// Immutable view of one node, detached from the Document.
///
/// Bounds and scalar state are copied; geometry and paint buffers are shared
/// with the Document, which replaces rather than mutates them.
#[derive(Debug, Clone)]
pub struct NodeView {
    pub id: NodeId,
    pub z: usize,
    pub bounds: Rect,
    pub transform: Transform,
    pub geometry: Arc<Geometry>,
    pub fills: Arc<Vec<Paint>>,
    pub strokes: Arc<Vec<Paint>>,
    pub stroke: StrokeStyle,
    pub fill_rule: FillRule,
    pub opacity: f32,
    pub visible: bool,
}

impl NodeView {
    pub(super) fn of(node: &Node, z: usize) -> Self {
        Self {
            id: node.id,
            z,
            bounds: node.bounds,
            transform: node.transform,
            geometry: Arc::clone(&node.geometry),
            fills: Arc::clone(&node.fills),
            strokes: Arc::clone(&node.strokes),
            stroke: node.stroke,
            fill_rule: node.fill_rule,
            opacity: node.opacity,
            visible: node.visible,
        }
    }
}

/// Every node of a Document at one revision, bottom to top.
#[derive(Debug, Clone, Default)]
pub struct DocumentSnapshot {
    pub revision: u64,
    pub nodes: Vec<NodeView>,
}

impl DocumentSnapshot {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Union of the bounds of all visible nodes.
    pub fn content_bounds(&self) -> Option<Rect> {
        crate::geometry::bounds::union_all(self.nodes.iter().filter(|n| n.visible).map(|n| n.bounds))
    }
}

/// What the render pipeline needs for one frame: nodes visible in `region`
/// (bottom to top) and the changes accumulated since the previous frame.
///
/// Taken under a single lock acquisition, so a frame never mixes state from
/// before and after a concurrent mutation.
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub revision: u64,
    pub region: Rect,
    pub visible: Vec<NodeView>,
    pub delta: DirtySet,
}
