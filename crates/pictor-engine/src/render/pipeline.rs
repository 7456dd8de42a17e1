use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kurbo::Rect;
use serde::Serialize;

use crate::config::RenderConfig;
use crate::document::{DirtySet, FrameSnapshot, NodeId, SharedDocument};
use crate::error::RenderSurfaceError;
use crate::surface::RenderSurface;
use crate::time::FrameBudget;

use super::compile::PaintCompiler;
use super::state::FrameState;
use super::stream::{DrawItem, DrawStream, Viewport};

/// What a frame did.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub revision: u64,
    /// False when the previous stream was resubmitted untouched.
    pub recompiled: bool,
    pub compiled: usize,
    pub reused: usize,
    /// Dirty nodes left for the next frame because the budget ran out.
    pub deferred: usize,
    pub degraded: bool,
    pub items: usize,
}

/// Turns document frames into draw streams and feeds them to a surface.
///
/// Per frame: collect visible nodes and the dirty delta, compile what changed,
/// submit, present. Items of unchanged nodes are reused from the previous
/// frame; a frame with nothing to do resubmits the previous stream as is.
pub struct RenderPipeline<S: RenderSurface> {
    surface: S,
    config: RenderConfig,
    compiler: PaintCompiler,
    state: FrameState,
    region: Option<Rect>,
    items: HashMap<NodeId, DrawItem>,
    last: Option<Arc<DrawStream>>,
    needs_full: bool,
}

impl<S: RenderSurface> RenderPipeline<S> {
    pub fn new(surface: S, config: RenderConfig) -> Self {
        log::info!("render pipeline on {:?} surface", surface.kind());
        Self {
            surface,
            config,
            compiler: PaintCompiler::new(),
            state: FrameState::Idle,
            region: None,
            items: HashMap::new(),
            last: None,
            needs_full: true,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: RenderConfig) {
        self.config = config;
        self.invalidate();
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn compiler(&self) -> &PaintCompiler {
        &self.compiler
    }

    pub fn last_stream(&self) -> Option<&Arc<DrawStream>> {
        self.last.as_ref()
    }

    /// Shows `region` of the document; `None` maps document units 1:1 to pixels.
    pub fn set_region(&mut self, region: Option<Rect>) {
        self.region = region;
    }

    pub fn viewport(&self) -> Viewport {
        let (width, height) = self.surface.viewport();
        match self.region {
            Some(region) => Viewport { region, width, height },
            None => Viewport::pixels(width, height),
        }
    }

    /// Forces the next frame to recompile everything.
    pub fn invalidate(&mut self) {
        self.needs_full = true;
    }

    fn advance(&mut self, next: FrameState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal frame transition {:?} -> {next:?}",
            self.state
        );
        self.state = next;
    }

    /// Renders one frame of `doc`.
    ///
    /// On `ContextLost` the surface is recreated before returning the error and
    /// the next frame recompiles and resubmits the whole visible scene.
    pub fn frame(&mut self, doc: &SharedDocument) -> Result<FrameReport, RenderSurfaceError> {
        self.advance(FrameState::Collecting);
        let viewport = self.viewport();
        let frame = doc.begin_frame(viewport.region);

        if self.last.as_ref().is_none_or(|s| s.viewport != viewport) {
            self.needs_full = true;
        }

        let (stream, report) = match &self.last {
            Some(last) if !self.needs_full && frame.delta.is_empty() => (
                Arc::clone(last),
                FrameReport {
                    revision: frame.revision,
                    recompiled: false,
                    reused: last.items.len(),
                    items: last.items.len(),
                    ..FrameReport::default()
                },
            ),
            _ => {
                self.advance(FrameState::Compiling);
                self.compile(frame, viewport, doc)
            }
        };

        self.advance(FrameState::Submitting);
        if let Err(err) = self.surface.submit(&stream) {
            return Err(self.fail(err));
        }
        self.advance(FrameState::Presented);
        if let Err(err) = self.surface.present() {
            return Err(self.fail(err));
        }
        self.last = Some(stream);
        self.advance(FrameState::Idle);

        if report.degraded {
            log::debug!("frame degraded: {} nodes deferred", report.deferred);
        }
        Ok(report)
    }

    fn compile(&mut self, frame: FrameSnapshot, viewport: Viewport, doc: &SharedDocument) -> (Arc<DrawStream>, FrameReport) {
        let full = std::mem::take(&mut self.needs_full);
        if full {
            self.items.clear();
        }
        for id in frame.delta.removed() {
            self.items.remove(id);
        }

        let to_device = viewport.to_device();
        let tolerance = self.config.flatten_tolerance;
        let budget = FrameBudget::start(self.config.frame_budget());
        let mut pending = DirtySet::new();
        let mut report = FrameReport {
            revision: frame.revision,
            recompiled: true,
            ..FrameReport::default()
        };

        let mut items = Vec::with_capacity(frame.visible.len());
        for view in &frame.visible {
            let cached = self.items.get(&view.id);
            let stale = frame.delta.contains(view.id) || cached.is_none();
            if !stale {
                if let Some(item) = cached {
                    items.push(DrawItem { z: view.z, ..item.clone() });
                    report.reused += 1;
                }
                continue;
            }
            if budget.is_exhausted() {
                report.deferred += 1;
                pending.mark_changed(view.id);
                if let Some(item) = cached {
                    items.push(DrawItem { z: view.z, ..item.clone() });
                }
                continue;
            }
            let item = self.compiler.compile_node(view, to_device, tolerance);
            self.items.insert(view.id, item.clone());
            items.push(item);
            report.compiled += 1;
        }

        // Changed nodes outside the viewport must not keep stale items.
        let visible: HashSet<NodeId> = frame.visible.iter().map(|v| v.id).collect();
        self.items
            .retain(|id, _| visible.contains(id) || !frame.delta.contains(*id));
        self.compiler.retain_used(self.items.values());

        if report.deferred > 0 {
            report.degraded = true;
            doc.requeue(pending);
        }
        report.items = items.len();

        let stream = Arc::new(DrawStream {
            revision: frame.revision,
            viewport,
            clear: self.config.clear_color,
            items,
        });
        (stream, report)
    }

    fn fail(&mut self, err: RenderSurfaceError) -> RenderSurfaceError {
        self.state = FrameState::Idle;
        self.needs_full = true;
        self.last = None;
        if err.is_context_loss() {
            log::warn!("render surface lost; recreating");
            self.items.clear();
            if let Err(recreate) = self.surface.recreate() {
                log::error!("surface recreation failed: {recreate}");
                return recreate;
            }
        }
        err
    }
}
