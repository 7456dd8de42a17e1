use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kurbo::Rect;

use crate::document::{NodeView, PaintTarget};
use crate::error::ValidationError;
use crate::geometry::{FillRule, Transform};
use crate::paint::{Color, Gradient, Paint, PaintId, PaintKind};

use super::flatten::{flatten, local_tolerance};
use super::ramp::{GradientRamp, RampKey};
use super::stream::{DrawItem, DrawPass, FlatPath, GradientShading, ResolvedPaint, Shading};

/// Paint compiled independently of where it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledPaint {
    Solid(Color),
    Linear { ramp: Arc<GradientRamp>, transform: Transform },
    Radial { ramp: Arc<GradientRamp>, transform: Transform },
}

#[derive(Debug)]
struct CacheEntry {
    content_hash: u64,
    compiled: CompiledPaint,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub paint_hits: usize,
    pub paint_misses: usize,
    pub ramps_built: usize,
}

/// Compiles paints and nodes into draw items.
///
/// Compiled paints are cached per paint identity and rebuilt when the paint's
/// content hash changes; gradient ramps are shared between all paints with
/// equal stops.
#[derive(Debug, Default)]
pub struct PaintCompiler {
    paints: HashMap<PaintId, CacheEntry>,
    ramps: HashMap<RampKey, Arc<GradientRamp>>,
    stats: CompileStats,
}

impl PaintCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CompileStats {
        self.stats
    }

    pub fn cached_paints(&self) -> usize {
        self.paints.len()
    }

    pub fn cached_ramps(&self) -> usize {
        self.ramps.len()
    }

    /// Drops cached paints and ramps that none of `live` draws with.
    pub fn retain_used<'a>(&mut self, live: impl IntoIterator<Item = &'a DrawItem>) {
        let mut paints = HashSet::new();
        let mut ramps = HashSet::new();
        for pass in live.into_iter().flat_map(|item| &item.passes) {
            paints.insert(pass.paint);
            if let Shading::Linear(g) | Shading::Radial(g) = &pass.resolved.shading {
                ramps.insert(g.ramp.key);
            }
        }
        let before = (self.paints.len(), self.ramps.len());
        self.paints.retain(|id, _| paints.contains(id));
        self.ramps.retain(|key, _| ramps.contains(key));
        let evicted = (before.0 - self.paints.len(), before.1 - self.ramps.len());
        if evicted != (0, 0) {
            log::trace!("evicted {} paints, {} ramps", evicted.0, evicted.1);
        }
    }

    pub fn compile(&mut self, paint: &Paint) -> CompiledPaint {
        let hash = paint.content_hash();
        if let Some(entry) = self.paints.get(&paint.id) {
            if entry.content_hash == hash {
                self.stats.paint_hits += 1;
                return entry.compiled.clone();
            }
        }
        self.stats.paint_misses += 1;
        let compiled = match &paint.kind {
            PaintKind::Solid { color } => CompiledPaint::Solid(*color),
            PaintKind::LinearGradient(g) => CompiledPaint::Linear {
                ramp: self.ramp(g),
                transform: g.transform,
            },
            PaintKind::RadialGradient(g) => CompiledPaint::Radial {
                ramp: self.ramp(g),
                transform: g.transform,
            },
        };
        self.paints.insert(
            paint.id,
            CacheEntry {
                content_hash: hash,
                compiled: compiled.clone(),
            },
        );
        compiled
    }

    fn ramp(&mut self, gradient: &Gradient) -> Arc<GradientRamp> {
        let key = RampKey::of(&gradient.stops);
        if let Some(ramp) = self.ramps.get(&key).filter(|r| r.stops == gradient.stops) {
            return Arc::clone(ramp);
        }
        self.stats.ramps_built += 1;
        let ramp = Arc::new(GradientRamp::build(&gradient.stops));
        self.ramps.insert(key, Arc::clone(&ramp));
        ramp
    }

    /// Places a compiled paint on a node.
    ///
    /// Gradient space maps onto `paint_box` (the unit square covers it), then
    /// through the node transform, then into device space, in that order.
    pub fn resolve(
        &self,
        compiled: &CompiledPaint,
        opacity: f32,
        paint_box: Rect,
        node_transform: Transform,
        to_device: Transform,
    ) -> Result<ResolvedPaint, ValidationError> {
        let gradient = |ramp: &Arc<GradientRamp>, transform: Transform| -> Result<GradientShading, ValidationError> {
            let unit_to_box = Transform::scale(paint_box.width(), paint_box.height())
                .then(Transform::translate(paint_box.x0, paint_box.y0));
            let to_device = transform.then(unit_to_box).then(node_transform).then(to_device);
            Ok(GradientShading {
                ramp: Arc::clone(ramp),
                from_device: to_device.try_invert()?,
                to_device,
            })
        };
        let shading = match compiled {
            CompiledPaint::Solid(color) => Shading::Solid(*color),
            CompiledPaint::Linear { ramp, transform } => Shading::Linear(gradient(ramp, *transform)?),
            CompiledPaint::Radial { ramp, transform } => Shading::Radial(gradient(ramp, *transform)?),
        };
        Ok(ResolvedPaint { opacity, shading })
    }

    /// Compiles one node into a draw item in device space.
    ///
    /// Paints that cannot be placed (degenerate gradient placement) are skipped
    /// with a warning; the rest of the node still draws.
    pub fn compile_node(&mut self, node: &NodeView, to_device: Transform, tolerance: f64) -> DrawItem {
        let node_to_device = node.transform.then(to_device);
        let local_tol = local_tolerance(node_to_device, tolerance);
        let outline = node.geometry.to_path(local_tol);
        let paint_box = node.geometry.local_bounds();

        let mut passes = Vec::new();
        if !node.fills.is_empty() {
            let path = Arc::new(flatten(&outline, node_to_device, tolerance));
            if !path.is_empty() {
                self.push_passes(&mut passes, node, PaintTarget::Fill, &path, node.fill_rule, paint_box, to_device);
            }
        }
        if !node.strokes.is_empty() && node.stroke.width > 0.0 {
            let stroke = node.stroke.outline(&outline, local_tol);
            let path = Arc::new(flatten(&stroke, node_to_device, tolerance));
            if !path.is_empty() {
                self.push_passes(&mut passes, node, PaintTarget::Stroke, &path, FillRule::NonZero, paint_box, to_device);
            }
        }

        DrawItem {
            node: node.id,
            z: node.z,
            bounds: node.bounds,
            passes,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_passes(
        &mut self,
        passes: &mut Vec<DrawPass>,
        node: &NodeView,
        target: PaintTarget,
        path: &Arc<FlatPath>,
        fill_rule: FillRule,
        paint_box: Rect,
        to_device: Transform,
    ) {
        let paints = match target {
            PaintTarget::Fill => &node.fills,
            PaintTarget::Stroke => &node.strokes,
        };
        // Index 0 is the top paint, so draw from the end of the list.
        for paint in paints.iter().rev() {
            let opacity = paint.opacity * node.opacity;
            if opacity <= 0.0 {
                continue;
            }
            let compiled = self.compile(paint);
            match self.resolve(&compiled, opacity, paint_box, node.transform, to_device) {
                Ok(resolved) => passes.push(DrawPass {
                    paint: paint.id,
                    target,
                    path: Arc::clone(path),
                    fill_rule,
                    resolved,
                }),
                Err(err) => log::warn!("skipping paint {} on node {}: {err}", paint.id, node.id),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeSpec};
    use crate::geometry::Geometry;
    use crate::paint::GradientStop;
    use kurbo::Point;

    fn stops() -> Vec<GradientStop> {
        vec![GradientStop::new(0.0, Color::BLACK), GradientStop::new(1.0, Color::WHITE)]
    }

    // ── cache ─────────────────────────────────────────────────────────────

    #[test]
    fn cache_hits_until_content_changes() {
        let mut c = PaintCompiler::new();
        let mut p = Paint::linear(stops());
        c.compile(&p);
        c.compile(&p);
        assert_eq!(c.stats().paint_hits, 1);
        assert_eq!(c.stats().paint_misses, 1);

        p.gradient_mut().unwrap().transform = Transform::rotate_deg(45.0);
        c.compile(&p);
        assert_eq!(c.stats().paint_misses, 2);
        // Same stops, so the ramp is reused.
        assert_eq!(c.stats().ramps_built, 1);
        assert_eq!(c.cached_paints(), 1);
    }

    #[test]
    fn colliding_ramp_key_is_not_trusted() {
        let mut c = PaintCompiler::new();
        let other = vec![GradientStop::new(0.0, Color::rgb(255, 0, 0)), GradientStop::new(1.0, Color::WHITE)];
        c.ramps.insert(RampKey::of(&stops()), Arc::new(GradientRamp::build(&other)));

        let CompiledPaint::Linear { ramp, .. } = c.compile(&Paint::linear(stops())) else {
            panic!("unexpected compile result");
        };
        assert_eq!(ramp.stops, stops());
        assert_eq!(c.stats().ramps_built, 1);
    }

    #[test]
    fn unused_entries_are_evicted() {
        let mut doc = Document::new();
        let kept = Paint::linear(stops());
        let id = doc
            .create_node(NodeSpec::new(Geometry::rect(4.0, 4.0)).with_fill(kept.clone()))
            .unwrap();
        let mut c = PaintCompiler::new();
        c.compile(&Paint::radial(vec![
            GradientStop::new(0.0, Color::WHITE),
            GradientStop::new(1.0, Color::BLACK),
        ]));
        let snapshot = doc.snapshot();
        let view = snapshot.nodes.iter().find(|v| v.id == id).unwrap();
        let item = c.compile_node(view, Transform::IDENTITY, 0.25);
        assert_eq!((c.cached_paints(), c.cached_ramps()), (2, 2));

        c.retain_used([&item]);
        assert_eq!((c.cached_paints(), c.cached_ramps()), (1, 1));
        c.retain_used(std::iter::empty());
        assert_eq!((c.cached_paints(), c.cached_ramps()), (0, 0));
    }

    #[test]
    fn distinct_paints_share_ramps() {
        let mut c = PaintCompiler::new();
        let a = c.compile(&Paint::linear(stops()));
        let b = c.compile(&Paint::radial(stops()));
        let (CompiledPaint::Linear { ramp: ra, .. }, CompiledPaint::Radial { ramp: rb, .. }) = (&a, &b) else {
            panic!("unexpected compile result");
        };
        assert!(Arc::ptr_eq(ra, rb));
        assert_eq!(c.cached_ramps(), 1);
    }

    // ── resolve ───────────────────────────────────────────────────────────

    #[test]
    fn gradient_space_spans_the_paint_box() {
        let c = PaintCompiler::new();
        let compiled = CompiledPaint::Linear {
            ramp: Arc::new(GradientRamp::build(&stops())),
            transform: Transform::IDENTITY,
        };
        let resolved = c
            .resolve(
                &compiled,
                1.0,
                Rect::new(0.0, 0.0, 200.0, 100.0),
                Transform::translate(10.0, 20.0),
                Transform::scale(2.0, 2.0),
            )
            .unwrap();
        let Shading::Linear(g) = resolved.shading else {
            panic!("expected linear shading");
        };
        // gradient (1, 0) -> box (200, 0) -> node (210, 20) -> device (420, 40)
        assert_eq!(g.to_device.apply(Point::new(1.0, 0.0)), Point::new(420.0, 40.0));
        let back = g.from_device.apply(Point::new(420.0, 40.0));
        assert!((back.x - 1.0).abs() < 1e-9 && back.y.abs() < 1e-9);
    }

    #[test]
    fn flat_paint_box_cannot_place_a_gradient() {
        let c = PaintCompiler::new();
        let compiled = CompiledPaint::Radial {
            ramp: Arc::new(GradientRamp::build(&stops())),
            transform: Transform::IDENTITY,
        };
        let err = c
            .resolve(&compiled, 1.0, Rect::new(0.0, 0.0, 10.0, 0.0), Transform::IDENTITY, Transform::IDENTITY)
            .unwrap_err();
        assert!(matches!(err, ValidationError::DegenerateTransform { .. }));
    }

    // ── nodes ─────────────────────────────────────────────────────────────

    #[test]
    fn fills_draw_bottom_up_then_strokes() {
        let top = Paint::solid(Color::rgb(255, 0, 0));
        let bottom = Paint::solid(Color::rgb(0, 0, 255));
        let edge = Paint::solid(Color::BLACK);
        let mut doc = Document::new();
        doc.create_node(
            NodeSpec::new(Geometry::rect(10.0, 10.0))
                .with_fills(vec![top.clone(), bottom.clone()])
                .with_stroke(edge.clone(), crate::geometry::StrokeStyle::with_width(1.0)),
        )
        .unwrap();
        let snap = doc.snapshot();

        let mut c = PaintCompiler::new();
        let item = c.compile_node(&snap.nodes[0], Transform::IDENTITY, 0.25);
        let order: Vec<PaintId> = item.passes.iter().map(|p| p.paint).collect();
        assert_eq!(order, vec![bottom.id, top.id, edge.id]);
        assert_eq!(item.passes[2].target, PaintTarget::Stroke);
        assert!(Arc::ptr_eq(&item.passes[0].path, &item.passes[1].path));
    }

    #[test]
    fn node_opacity_scales_pass_opacity() {
        let mut doc = Document::new();
        doc.create_node(
            NodeSpec::new(Geometry::rect(10.0, 10.0))
                .with_fill(Paint::solid(Color::BLACK).with_opacity(0.5))
                .with_opacity(0.5),
        )
        .unwrap();
        let snap = doc.snapshot();
        let item = PaintCompiler::new().compile_node(&snap.nodes[0], Transform::IDENTITY, 0.25);
        assert_eq!(item.passes[0].resolved.opacity, 0.25);
    }
}
