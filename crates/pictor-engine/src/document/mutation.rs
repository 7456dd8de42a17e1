use serde::{Deserialize, Serialize};

use crate::geometry::Transform;
use crate::paint::{GradientStop, Paint, PaintId, PaintType};

use super::node::Node;
use super::{NodeId, NodeSpec, NodeUpdate, PaintTarget};

/// One step of a document transaction.
///
/// Every public mutation method on [`Document`](super::Document) is a
/// single-entry batch of one of these, so recorded sessions and import
/// batches replay through the exact same code path as interactive edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateNode(NodeSpec),
    UpdateNode {
        id: NodeId,
        update: NodeUpdate,
    },
    DeleteNode {
        id: NodeId,
    },
    SetPaints {
        id: NodeId,
        target: PaintTarget,
        paints: Vec<Paint>,
    },
    ClearPaints {
        id: NodeId,
        target: PaintTarget,
    },
    /// Inserts at `index` (0 = visually top); `None` appends at the bottom.
    AddPaint {
        id: NodeId,
        target: PaintTarget,
        index: Option<usize>,
        paint: Paint,
    },
    RemovePaint {
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
    },
    ReplacePaint {
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        with: Paint,
    },
    SetPaintStops {
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        stops: Vec<GradientStop>,
    },
    SetPaintTransform {
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        transform: Transform,
    },
    ConvertPaint {
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        to: PaintType,
    },
    MoveNode {
        id: NodeId,
        z: usize,
    },
}

impl Mutation {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Mutation::CreateNode(spec) => spec.id,
            Mutation::UpdateNode { id, .. }
            | Mutation::DeleteNode { id }
            | Mutation::SetPaints { id, .. }
            | Mutation::ClearPaints { id, .. }
            | Mutation::AddPaint { id, .. }
            | Mutation::RemovePaint { id, .. }
            | Mutation::ReplacePaint { id, .. }
            | Mutation::SetPaintStops { id, .. }
            | Mutation::SetPaintTransform { id, .. }
            | Mutation::ConvertPaint { id, .. }
            | Mutation::MoveNode { id, .. } => Some(*id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mutation::CreateNode(_) => "create_node",
            Mutation::UpdateNode { .. } => "update_node",
            Mutation::DeleteNode { .. } => "delete_node",
            Mutation::SetPaints { .. } => "set_paints",
            Mutation::ClearPaints { .. } => "clear_paints",
            Mutation::AddPaint { .. } => "add_paint",
            Mutation::RemovePaint { .. } => "remove_paint",
            Mutation::ReplacePaint { .. } => "replace_paint",
            Mutation::SetPaintStops { .. } => "set_paint_stops",
            Mutation::SetPaintTransform { .. } => "set_paint_transform",
            Mutation::ConvertPaint { .. } => "convert_paint",
            Mutation::MoveNode { .. } => "move_node",
        }
    }
}

/// Inverse of an applied mutation, used to roll a failed batch back.
#[derive(Debug)]
pub(super) enum Undo {
    /// Undo a creation.
    Remove(NodeId),
    /// Undo a deletion.
    Reinsert { node: Node, z: usize },
    /// Undo an in-place edit. Nodes share their buffers, so this clone is shallow.
    Restore(Node),
    /// Undo a z-order move.
    Move { id: NodeId, z: usize },
}

/// Result of a committed transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Ids of nodes created by the batch, in batch order.
    pub created: Vec<NodeId>,
    /// Document revision after the batch.
    pub revision: u64,
    pub applied: usize,
}
