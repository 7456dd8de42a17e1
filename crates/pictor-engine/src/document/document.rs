use std::collections::HashMap;
use std::sync::Arc;

use kurbo::{Point, Rect};

use crate::error::{EngineError, IndexConsistencyError, ValidationError};
use crate::geometry::{FillRule, Geometry, StrokeStyle, Transform};
use crate::paint::{convert, normalize_stops, GradientStop, Paint, PaintId, PaintType};
use crate::spatial::SpatialIndex;

use super::dirty::DirtySet;
use super::mutation::{BatchReport, Mutation, Undo};
use super::node::{prepare_paint, prepare_paints, validate_stroke, Node};
use super::snapshot::{DocumentSnapshot, FrameSnapshot, NodeView};
use super::{NodeId, NodeSpec, NodeUpdate, PaintTarget};

/// The scene: node arena, z-order and the spatial index over node bounds.
///
/// Nodes change only through the mutation API. Every operation that moves a
/// bounding box updates the index before returning, and every
/// render-affecting change lands in the dirty set.
#[derive(Debug, Default)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    /// Bottom to top.
    order: Vec<NodeId>,
    z_of: HashMap<NodeId, usize>,
    index: SpatialIndex,
    dirty: DirtySet,
    revision: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    // ── mutation API ──────────────────────────────────────────────────────

    pub fn create_node(&mut self, spec: NodeSpec) -> Result<NodeId, EngineError> {
        let report = self.apply_batch(&[Mutation::CreateNode(spec)])?;
        report
            .created
            .first()
            .copied()
            .ok_or(EngineError::IndexConsistency(IndexConsistencyError::CountMismatch {
                indexed: self.index.len(),
                live: self.nodes.len(),
            }))
    }

    pub fn update_node(&mut self, id: NodeId, update: NodeUpdate) -> Result<(), EngineError> {
        self.commit(Mutation::UpdateNode { id, update })
    }

    pub fn delete_node(&mut self, id: NodeId) -> Result<(), EngineError> {
        self.commit(Mutation::DeleteNode { id })
    }

    pub fn set_paints(&mut self, id: NodeId, target: PaintTarget, paints: Vec<Paint>) -> Result<(), EngineError> {
        self.commit(Mutation::SetPaints { id, target, paints })
    }

    pub fn clear_paints(&mut self, id: NodeId, target: PaintTarget) -> Result<(), EngineError> {
        self.commit(Mutation::ClearPaints { id, target })
    }

    pub fn add_paint(
        &mut self,
        id: NodeId,
        target: PaintTarget,
        index: Option<usize>,
        paint: Paint,
    ) -> Result<(), EngineError> {
        self.commit(Mutation::AddPaint { id, target, index, paint })
    }

    pub fn remove_paint(&mut self, id: NodeId, target: PaintTarget, paint: PaintId) -> Result<(), EngineError> {
        self.commit(Mutation::RemovePaint { id, target, paint })
    }

    pub fn replace_paint(
        &mut self,
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        with: Paint,
    ) -> Result<(), EngineError> {
        self.commit(Mutation::ReplacePaint { id, target, paint, with })
    }

    pub fn set_paint_stops(
        &mut self,
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        stops: Vec<GradientStop>,
    ) -> Result<(), EngineError> {
        self.commit(Mutation::SetPaintStops { id, target, paint, stops })
    }

    pub fn set_paint_transform(
        &mut self,
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        transform: Transform,
    ) -> Result<(), EngineError> {
        self.commit(Mutation::SetPaintTransform { id, target, paint, transform })
    }

    pub fn convert_paint(
        &mut self,
        id: NodeId,
        target: PaintTarget,
        paint: PaintId,
        to: PaintType,
    ) -> Result<(), EngineError> {
        self.commit(Mutation::ConvertPaint { id, target, paint, to })
    }

    /// Moves a node to z position `z` (0 = bottom).
    pub fn move_node(&mut self, id: NodeId, z: usize) -> Result<(), EngineError> {
        self.commit(Mutation::MoveNode { id, z })
    }

    fn commit(&mut self, mutation: Mutation) -> Result<(), EngineError> {
        self.apply_batch(std::slice::from_ref(&mutation)).map(|_| ())
    }

    /// Applies `batch` as one transaction: either every mutation lands or none does.
    ///
    /// On failure the already-applied steps are undone in reverse order and the
    /// dirty set is restored, so the Document is observably unchanged.
    pub fn apply_batch(&mut self, batch: &[Mutation]) -> Result<BatchReport, EngineError> {
        if batch.is_empty() {
            return Ok(BatchReport {
                revision: self.revision,
                ..BatchReport::default()
            });
        }

        let dirty_before = self.dirty.clone();
        let mut undo: Vec<Undo> = Vec::with_capacity(batch.len());
        let mut created = Vec::new();

        for (i, mutation) in batch.iter().enumerate() {
            match self.apply(mutation) {
                Ok(step) => {
                    if let Undo::Remove(id) = &step {
                        created.push(*id);
                    }
                    undo.push(step);
                }
                Err(err) => {
                    log::debug!("batch rejected at step {i} ({}): {err}", mutation.name());
                    for step in undo.into_iter().rev() {
                        self.rollback(step)?;
                    }
                    self.dirty = dirty_before;
                    return Err(err);
                }
            }
        }

        self.revision += 1;
        if cfg!(debug_assertions) {
            self.check_consistency()?;
        }
        log::debug!("applied batch of {} at revision {}", batch.len(), self.revision);
        Ok(BatchReport {
            created,
            revision: self.revision,
            applied: batch.len(),
        })
    }

    fn apply(&mut self, mutation: &Mutation) -> Result<Undo, EngineError> {
        log::trace!("apply {} {:?}", mutation.name(), mutation.node());
        match mutation {
            Mutation::CreateNode(spec) => {
                let id = spec.id.unwrap_or_default();
                if self.nodes.contains_key(&id) {
                    return Err(EngineError::DuplicateNode(id));
                }
                let len = self.order.len();
                let z = spec.z.unwrap_or(len);
                if z > len {
                    return Err(EngineError::ZOutOfRange { z, len });
                }
                let node = spec.clone().into_node(id)?;
                self.insert_at(node, z)?;
                Ok(Undo::Remove(id))
            }
            Mutation::UpdateNode { id, update } => self.update(*id, update),
            Mutation::DeleteNode { id } => {
                let (node, z) = self.remove(*id)?;
                Ok(Undo::Reinsert { node, z })
            }
            Mutation::SetPaints { id, target, paints } => {
                let paints = prepare_paints(paints.clone())?;
                self.edit_paints(*id, *target, |list| {
                    *list = paints;
                    Ok(())
                })
            }
            Mutation::ClearPaints { id, target } => self.edit_paints(*id, *target, |list| {
                list.clear();
                Ok(())
            }),
            Mutation::AddPaint { id, target, index, paint } => {
                let paint = prepare_paint(paint.clone())?;
                self.edit_paints(*id, *target, |list| {
                    let at = index.unwrap_or(list.len());
                    if at > list.len() {
                        return Err(EngineError::PaintIndexOutOfRange { index: at, len: list.len() });
                    }
                    list.insert(at, paint);
                    Ok(())
                })
            }
            Mutation::RemovePaint { id, target, paint } => {
                let node = *id;
                self.edit_paints(node, *target, |list| {
                    let at = position(list, node, *paint)?;
                    list.remove(at);
                    Ok(())
                })
            }
            Mutation::ReplacePaint { id, target, paint, with } => {
                let node = *id;
                let with = prepare_paint(with.clone())?;
                self.edit_paints(node, *target, |list| {
                    let at = position(list, node, *paint)?;
                    list[at] = with;
                    Ok(())
                })
            }
            Mutation::SetPaintStops { id, target, paint, stops } => {
                let node = *id;
                let stops = normalize_stops(stops)?;
                self.edit_paints(node, *target, |list| {
                    let at = position(list, node, *paint)?;
                    let gradient = list[at]
                        .gradient_mut()
                        .ok_or(ValidationError::NotAGradient(*paint))?;
                    gradient.stops = stops;
                    Ok(())
                })
            }
            Mutation::SetPaintTransform { id, target, paint, transform } => {
                let node = *id;
                if !transform.is_finite() {
                    return Err(ValidationError::NonFinite { what: "gradient transform" }.into());
                }
                self.edit_paints(node, *target, |list| {
                    let at = position(list, node, *paint)?;
                    let gradient = list[at]
                        .gradient_mut()
                        .ok_or(ValidationError::NotAGradient(*paint))?;
                    gradient.transform = *transform;
                    Ok(())
                })
            }
            Mutation::ConvertPaint { id, target, paint, to } => {
                let node = *id;
                self.edit_paints(node, *target, |list| {
                    let at = position(list, node, *paint)?;
                    list[at] = prepare_paint(convert(&list[at], *to))?;
                    Ok(())
                })
            }
            Mutation::MoveNode { id, z } => {
                let len = self.order.len();
                if *z >= len {
                    return Err(EngineError::ZOutOfRange { z: *z, len });
                }
                let from = self.reorder(*id, *z)?;
                Ok(Undo::Move { id: *id, z: from })
            }
        }
    }

    fn rollback(&mut self, step: Undo) -> Result<(), IndexConsistencyError> {
        match step {
            Undo::Remove(id) => {
                self.remove(id).map_err(|_| IndexConsistencyError::MissingEntry(id))?;
            }
            Undo::Reinsert { node, z } => self.insert_at(node, z)?,
            Undo::Restore(node) => {
                let id = node.id;
                let bounds = node.bounds;
                if let Some(previous) = self.nodes.insert(id, node) {
                    if previous.bounds != bounds {
                        self.index.update(id, bounds)?;
                    }
                }
            }
            Undo::Move { id, z } => {
                self.reorder(id, z).map_err(|_| IndexConsistencyError::MissingEntry(id))?;
            }
        }
        Ok(())
    }

    fn insert_at(&mut self, node: Node, z: usize) -> Result<(), IndexConsistencyError> {
        let id = node.id;
        self.index.insert(id, node.bounds)?;
        self.nodes.insert(id, node);
        self.order.insert(z, id);
        self.renumber(z);
        self.dirty.mark_changed(id);
        self.dirty.mark_order();
        Ok(())
    }

    fn remove(&mut self, id: NodeId) -> Result<(Node, usize), EngineError> {
        let z = *self.z_of.get(&id).ok_or(EngineError::NodeNotFound(id))?;
        self.index.remove(id)?;
        let node = self.nodes.remove(&id).ok_or(EngineError::NodeNotFound(id))?;
        self.z_of.remove(&id);
        self.order.remove(z);
        self.renumber(z);
        self.dirty.mark_removed(id);
        self.dirty.mark_order();
        Ok((node, z))
    }

    /// Moves `id` to `z`, returning its previous position.
    fn reorder(&mut self, id: NodeId, z: usize) -> Result<usize, EngineError> {
        let from = *self.z_of.get(&id).ok_or(EngineError::NodeNotFound(id))?;
        if from != z {
            self.order.remove(from);
            self.order.insert(z, id);
            self.renumber(from.min(z));
            self.dirty.mark_order();
        }
        Ok(from)
    }

    fn renumber(&mut self, from: usize) {
        for (z, id) in self.order.iter().enumerate().skip(from) {
            self.z_of.insert(*id, z);
        }
    }

    fn update(&mut self, id: NodeId, update: &NodeUpdate) -> Result<Undo, EngineError> {
        if let Some(geometry) = &update.geometry {
            geometry.validate()?;
        }
        if let Some(transform) = &update.transform {
            if !transform.is_finite() {
                return Err(ValidationError::NonFinite { what: "node transform" }.into());
            }
        }
        if let Some(stroke) = &update.stroke {
            validate_stroke(stroke)?;
        }
        if update.opacity.is_some_and(|o| !o.is_finite()) {
            return Err(ValidationError::NonFinite { what: "node opacity" }.into());
        }

        let node = self.nodes.get_mut(&id).ok_or(EngineError::NodeNotFound(id))?;
        let before = node.clone();
        if let Some(name) = &update.name {
            node.name.clone_from(name);
        }
        if let Some(geometry) = &update.geometry {
            node.geometry = Arc::new(geometry.clone());
        }
        if let Some(transform) = update.transform {
            node.transform = transform;
        }
        if let Some(stroke) = update.stroke {
            node.stroke = stroke;
        }
        if let Some(fill_rule) = update.fill_rule {
            node.fill_rule = fill_rule;
        }
        if let Some(opacity) = update.opacity {
            node.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(visible) = update.visible {
            node.visible = visible;
        }
        if update.touches_bounds() {
            node.recompute_bounds();
            if node.bounds != before.bounds {
                self.index.update(id, node.bounds)?;
            }
        }
        self.dirty.mark_changed(id);
        Ok(Undo::Restore(before))
    }

    /// Edits a copy of one paint list and swaps it in only when `edit` succeeds.
    fn edit_paints(
        &mut self,
        id: NodeId,
        target: PaintTarget,
        edit: impl FnOnce(&mut Vec<Paint>) -> Result<(), EngineError>,
    ) -> Result<Undo, EngineError> {
        let node = self.nodes.get_mut(&id).ok_or(EngineError::NodeNotFound(id))?;
        let mut list = node.paints(target).as_ref().clone();
        edit(&mut list)?;

        let before = node.clone();
        node.set_paint_list(target, list);
        if node.bounds != before.bounds {
            self.index.update(id, node.bounds)?;
        }
        self.dirty.mark_changed(id);
        Ok(Undo::Restore(before))
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn paints(&self, id: NodeId, target: PaintTarget) -> Result<&Arc<Vec<Paint>>, EngineError> {
        self.nodes
            .get(&id)
            .map(|n| n.paints(target))
            .ok_or(EngineError::NodeNotFound(id))
    }

    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        self.nodes.get(&id).map(Node::bounds)
    }

    pub fn z_index(&self, id: NodeId) -> Option<usize> {
        self.z_of.get(&id).copied()
    }

    /// Node ids bottom to top.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    /// Nodes whose bounds intersect `region`, bottom to top.
    pub fn query_region(&self, region: Rect) -> Vec<NodeId> {
        let mut hits: Vec<(usize, NodeId)> = self
            .index
            .query_region(region)
            .into_iter()
            .filter_map(|id| self.z_of.get(&id).map(|z| (*z, id)))
            .collect();
        hits.sort_unstable_by_key(|(z, _)| *z);
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Nodes whose bounds contain `p`, topmost first.
    pub fn query_point(&self, p: Point) -> Vec<NodeId> {
        self.index.query_point_ordered(p, |id| self.z_of.get(&id).copied())
    }

    /// Topmost visible node whose geometry or stroke precisely contains `p`.
    pub fn hit_test(&self, p: Point) -> Option<NodeId> {
        self.query_point(p).into_iter().find(|id| {
            self.nodes
                .get(id)
                .is_some_and(|node| node.is_visible() && node.hit(p))
        })
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            revision: self.revision,
            nodes: self
                .order
                .iter()
                .enumerate()
                .filter_map(|(z, id)| self.nodes.get(id).map(|n| NodeView::of(n, z)))
                .collect(),
        }
    }

    /// Captures the visible nodes in `region` and drains the dirty set.
    pub fn begin_frame(&mut self, region: Rect) -> FrameSnapshot {
        let visible = self
            .query_region(region)
            .into_iter()
            .filter_map(|id| {
                let node = self.nodes.get(&id)?;
                let z = *self.z_of.get(&id)?;
                node.is_visible().then(|| NodeView::of(node, z))
            })
            .collect();
        FrameSnapshot {
            revision: self.revision,
            region,
            visible,
            delta: self.dirty.take(),
        }
    }

    /// Returns changes drained by [`begin_frame`](Self::begin_frame) that were not
    /// consumed, so the next frame picks them up again.
    pub fn requeue(&mut self, pending: DirtySet) {
        let newer = self.dirty.take();
        self.dirty = pending;
        self.dirty.merge(newer);
    }

    /// Verifies the spatial index and z-order against the live nodes.
    pub fn check_consistency(&self) -> Result<(), IndexConsistencyError> {
        if self.order.len() != self.nodes.len() || self.z_of.len() != self.nodes.len() {
            return Err(IndexConsistencyError::CountMismatch {
                indexed: self.order.len(),
                live: self.nodes.len(),
            });
        }
        self.index.verify(self.nodes.iter().map(|(id, n)| (*id, &n.bounds)))
    }
}

impl Document {
    /// Convenience for a filled primitive placed at `(x, y)`.
    pub fn add_shape(&mut self, geometry: Geometry, x: f64, y: f64, fill: Paint) -> Result<NodeId, EngineError> {
        self.create_node(
            NodeSpec::new(geometry)
                .with_transform(Transform::translate(x, y))
                .with_fill(fill),
        )
    }

    /// Sets the stroke style and fill rule together.
    pub fn set_outline(&mut self, id: NodeId, stroke: StrokeStyle, fill_rule: FillRule) -> Result<(), EngineError> {
        self.update_node(
            id,
            NodeUpdate {
                stroke: Some(stroke),
                fill_rule: Some(fill_rule),
                ..NodeUpdate::default()
            },
        )
    }
}

fn position(list: &[Paint], node: NodeId, paint: PaintId) -> Result<usize, EngineError> {
    list.iter()
        .position(|p| p.id == paint)
        .ok_or(EngineError::PaintNotFound { node, paint })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::{Color, PaintKind};

    fn red() -> Color {
        Color::rgb(255, 0, 0)
    }

    fn blue() -> Color {
        Color::rgb(0, 0, 255)
    }

    fn square(doc: &mut Document, x: f64, y: f64, size: f64) -> NodeId {
        doc.add_shape(Geometry::rect(size, size), x, y, Paint::solid(red()))
            .unwrap()
    }

    // ── creation & deletion ───────────────────────────────────────────────

    #[test]
    fn create_indexes_and_marks_dirty() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.bounds(a), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(doc.dirty().contains(a));
        assert_eq!(doc.query_region(Rect::new(5.0, 5.0, 15.0, 15.0)), vec![a]);
        assert!(doc.query_region(Rect::new(20.0, 20.0, 30.0, 30.0)).is_empty());
        assert_eq!(doc.revision(), 1);
    }

    #[test]
    fn delete_removes_from_map_and_index() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        doc.delete_node(a).unwrap();
        assert!(doc.node(a).is_none());
        assert!(doc.query_point(Point::new(5.0, 5.0)).is_empty());
        assert!(doc.dirty().removed().contains(&a));
        assert_eq!(doc.check_consistency(), Ok(()));
        assert_eq!(doc.delete_node(a), Err(EngineError::NodeNotFound(a)));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut doc = Document::new();
        let id = NodeId::new();
        doc.create_node(NodeSpec::new(Geometry::rect(1.0, 1.0)).with_id(id)).unwrap();
        let err = doc
            .create_node(NodeSpec::new(Geometry::rect(1.0, 1.0)).with_id(id))
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateNode(id));
        assert_eq!(doc.len(), 1);
    }

    // ── z-order ───────────────────────────────────────────────────────────

    #[test]
    fn query_point_returns_topmost_first() {
        let mut doc = Document::new();
        let bottom = square(&mut doc, 0.0, 0.0, 10.0);
        let top = square(&mut doc, 5.0, 5.0, 10.0);
        assert_eq!(doc.z_index(bottom), Some(0));
        assert_eq!(doc.z_index(top), Some(1));
        assert_eq!(doc.query_point(Point::new(7.0, 7.0)), vec![top, bottom]);
    }

    #[test]
    fn move_node_reorders_hits() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let b = square(&mut doc, 0.0, 0.0, 10.0);
        doc.move_node(b, 0).unwrap();
        assert_eq!(doc.order(), &[b, a]);
        assert_eq!(doc.query_point(Point::new(1.0, 1.0)), vec![a, b]);
        assert_eq!(
            doc.move_node(a, 2),
            Err(EngineError::ZOutOfRange { z: 2, len: 2 })
        );
    }

    #[test]
    fn create_at_z_inserts_below() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let b = doc
            .create_node(NodeSpec::new(Geometry::rect(10.0, 10.0)).at_z(0))
            .unwrap();
        assert_eq!(doc.order(), &[b, a]);
        assert_eq!(doc.z_index(a), Some(1));
    }

    #[test]
    fn hit_test_skips_bbox_only_hits() {
        let mut doc = Document::new();
        let rect = square(&mut doc, 0.0, 0.0, 10.0);
        let circle = doc
            .add_shape(Geometry::ellipse(10.0, 10.0), 0.0, 0.0, Paint::solid(blue()))
            .unwrap();
        // Corner lies inside both bboxes but outside the circle.
        assert_eq!(doc.hit_test(Point::new(0.5, 0.5)), Some(rect));
        assert_eq!(doc.hit_test(Point::new(5.0, 5.0)), Some(circle));
        doc.update_node(circle, NodeUpdate { visible: Some(false), ..NodeUpdate::default() })
            .unwrap();
        assert_eq!(doc.hit_test(Point::new(5.0, 5.0)), Some(rect));
    }

    // ── updates ───────────────────────────────────────────────────────────

    #[test]
    fn transform_update_moves_index_entry() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        doc.update_node(a, NodeUpdate::transform(Transform::translate(100.0, 0.0)))
            .unwrap();
        assert!(doc.query_point(Point::new(5.0, 5.0)).is_empty());
        assert_eq!(doc.query_point(Point::new(105.0, 5.0)), vec![a]);
        assert_eq!(doc.check_consistency(), Ok(()));
    }

    #[test]
    fn invalid_update_leaves_node_untouched() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let revision = doc.revision();
        let err = doc
            .update_node(a, NodeUpdate::geometry(Geometry::rect(-1.0, 5.0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::InvalidGeometry { .. })));
        assert_eq!(doc.bounds(a), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(doc.revision(), revision);
    }

    #[test]
    fn adding_first_stroke_grows_bounds() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        doc.set_outline(a, StrokeStyle::with_width(2.0), FillRule::NonZero).unwrap();
        assert_eq!(doc.bounds(a), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        doc.add_paint(a, PaintTarget::Stroke, None, Paint::solid(Color::BLACK)).unwrap();
        assert_eq!(doc.bounds(a), Some(Rect::new(-4.0, -4.0, 14.0, 14.0)));
        assert_eq!(doc.query_point(Point::new(-3.0, 5.0)), vec![a]);
    }

    // ── paints ────────────────────────────────────────────────────────────

    #[test]
    fn paint_list_editing() {
        let mut doc = Document::new();
        let a = doc.create_node(NodeSpec::new(Geometry::rect(10.0, 10.0))).unwrap();
        let p1 = Paint::solid(red());
        let p2 = Paint::solid(blue());
        let (id1, id2) = (p1.id, p2.id);
        doc.add_paint(a, PaintTarget::Fill, None, p1).unwrap();
        doc.add_paint(a, PaintTarget::Fill, Some(0), p2).unwrap();
        let ids: Vec<PaintId> = doc.paints(a, PaintTarget::Fill).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![id2, id1]);

        doc.remove_paint(a, PaintTarget::Fill, id2).unwrap();
        assert_eq!(doc.paints(a, PaintTarget::Fill).unwrap().len(), 1);
        assert_eq!(
            doc.remove_paint(a, PaintTarget::Fill, id2),
            Err(EngineError::PaintNotFound { node: a, paint: id2 })
        );
        assert_eq!(
            doc.add_paint(a, PaintTarget::Fill, Some(5), Paint::solid(red())),
            Err(EngineError::PaintIndexOutOfRange { index: 5, len: 1 })
        );

        doc.clear_paints(a, PaintTarget::Fill).unwrap();
        assert!(doc.paints(a, PaintTarget::Fill).unwrap().is_empty());
    }

    #[test]
    fn stops_on_solid_paint_are_rejected() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let pid = doc.paints(a, PaintTarget::Fill).unwrap()[0].id;
        let stops = vec![GradientStop::new(0.0, red()), GradientStop::new(1.0, blue())];
        assert_eq!(
            doc.set_paint_stops(a, PaintTarget::Fill, pid, stops),
            Err(EngineError::Validation(ValidationError::NotAGradient(pid)))
        );
    }

    #[test]
    fn convert_then_edit_stops() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let pid = doc.paints(a, PaintTarget::Fill).unwrap()[0].id;
        doc.convert_paint(a, PaintTarget::Fill, pid, PaintType::LinearGradient).unwrap();
        doc.set_paint_stops(
            a,
            PaintTarget::Fill,
            pid,
            vec![GradientStop::new(0.5, red()), GradientStop::new(0.2, blue())],
        )
        .unwrap();
        let paints = doc.paints(a, PaintTarget::Fill).unwrap();
        let PaintKind::LinearGradient(g) = &paints[0].kind else {
            panic!("expected linear gradient");
        };
        assert_eq!(g.stops, vec![GradientStop::new(0.2, blue()), GradientStop::new(0.5, red())]);
        assert_eq!(paints[0].id, pid);

        doc.set_paint_transform(a, PaintTarget::Fill, pid, Transform::rotate_deg(90.0)).unwrap();
        assert!(!doc.paints(a, PaintTarget::Fill).unwrap()[0].gradient().unwrap().transform.is_identity());
    }

    #[test]
    fn paint_edits_share_untouched_buffers() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let before = doc.snapshot();
        let pid = doc.paints(a, PaintTarget::Fill).unwrap()[0].id;
        doc.replace_paint(a, PaintTarget::Fill, pid, Paint::solid(blue())).unwrap();
        let after = doc.snapshot();
        assert!(Arc::ptr_eq(&before.nodes[0].geometry, &after.nodes[0].geometry));
        assert!(!Arc::ptr_eq(&before.nodes[0].fills, &after.nodes[0].fills));
        assert_eq!(before.nodes[0].fills[0].kind, PaintKind::Solid { color: red() });
    }

    // ── transactions ──────────────────────────────────────────────────────

    #[test]
    fn failing_batch_rolls_back_every_step() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let _ = doc.begin_frame(Rect::new(0.0, 0.0, 100.0, 100.0));
        let revision = doc.revision();

        let created = NodeId::new();
        let batch = vec![
            Mutation::CreateNode(NodeSpec::new(Geometry::rect(5.0, 5.0)).with_id(created)),
            Mutation::UpdateNode { id: a, update: NodeUpdate::transform(Transform::translate(50.0, 50.0)) },
            Mutation::DeleteNode { id: a },
            Mutation::DeleteNode { id: NodeId::new() },
        ];
        assert!(matches!(doc.apply_batch(&batch), Err(EngineError::NodeNotFound(_))));

        assert_eq!(doc.len(), 1);
        assert!(doc.node(created).is_none());
        assert_eq!(doc.bounds(a), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(doc.query_point(Point::new(5.0, 5.0)), vec![a]);
        assert_eq!(doc.revision(), revision);
        assert!(doc.dirty().is_empty());
        assert_eq!(doc.check_consistency(), Ok(()));
    }

    #[test]
    fn batch_can_reference_nodes_it_creates() {
        let mut doc = Document::new();
        let id = NodeId::new();
        let paint = Paint::solid(red());
        let batch = vec![
            Mutation::CreateNode(NodeSpec::new(Geometry::rect(5.0, 5.0)).with_id(id)),
            Mutation::AddPaint { id, target: PaintTarget::Fill, index: None, paint },
        ];
        let report = doc.apply_batch(&batch).unwrap();
        assert_eq!(report.created, vec![id]);
        assert_eq!(report.applied, 2);
        assert_eq!(report.revision, 1);
        assert_eq!(doc.paints(id, PaintTarget::Fill).unwrap().len(), 1);
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn begin_frame_culls_and_drains() {
        let mut doc = Document::new();
        let inside = square(&mut doc, 0.0, 0.0, 10.0);
        let outside = square(&mut doc, 500.0, 500.0, 10.0);
        let frame = doc.begin_frame(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(frame.visible.len(), 1);
        assert_eq!(frame.visible[0].id, inside);
        assert!(frame.delta.contains(outside));
        assert!(doc.dirty().is_empty());
        assert!(doc.node(outside).is_some());

        let again = doc.begin_frame(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(again.delta.is_empty());
    }

    #[test]
    fn requeue_keeps_newer_changes() {
        let mut doc = Document::new();
        let a = square(&mut doc, 0.0, 0.0, 10.0);
        let frame = doc.begin_frame(Rect::new(0.0, 0.0, 100.0, 100.0));
        let b = square(&mut doc, 20.0, 0.0, 10.0);
        doc.requeue(frame.delta);
        assert!(doc.dirty().contains(a));
        assert!(doc.dirty().contains(b));
    }
}
