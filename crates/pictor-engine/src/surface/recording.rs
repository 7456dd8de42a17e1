use std::sync::Arc;

use crate::error::RenderSurfaceError;
use crate::render::DrawStream;

use super::{RenderSurface, SurfaceKind};

/// Headless surface that keeps every submitted stream.
///
/// Used for tests, benchmarks and tools that need the compiled output
/// without a GPU. Failures can be scripted to exercise recovery paths.
#[derive(Debug)]
pub struct RecordingSurface {
    size: (u32, u32),
    submitted: Vec<Arc<DrawStream>>,
    presented: usize,
    recreated: usize,
    lost: bool,
    fail_next_submit: Option<RenderSurfaceError>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            submitted: Vec::new(),
            presented: 0,
            recreated: 0,
            lost: false,
            fail_next_submit: None,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Simulates a lost context: every call fails until `recreate`.
    pub fn lose_context(&mut self) {
        self.lost = true;
    }

    /// Makes the next `submit` fail once with `err`.
    pub fn fail_next_submit(&mut self, err: RenderSurfaceError) {
        self.fail_next_submit = Some(err);
    }

    pub fn submitted(&self) -> &[Arc<DrawStream>] {
        &self.submitted
    }

    pub fn last(&self) -> Option<&Arc<DrawStream>> {
        self.submitted.last()
    }

    pub fn presented(&self) -> usize {
        self.presented
    }

    pub fn recreated(&self) -> usize {
        self.recreated
    }
}

impl RenderSurface for RecordingSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Headless
    }

    fn viewport(&self) -> (u32, u32) {
        self.size
    }

    fn submit(&mut self, stream: &Arc<DrawStream>) -> Result<(), RenderSurfaceError> {
        if self.lost {
            return Err(RenderSurfaceError::ContextLost);
        }
        if let Some(err) = self.fail_next_submit.take() {
            return Err(err);
        }
        self.submitted.push(Arc::clone(stream));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        if self.lost {
            return Err(RenderSurfaceError::ContextLost);
        }
        self.presented += 1;
        Ok(())
    }

    fn recreate(&mut self) -> Result<(), RenderSurfaceError> {
        self.lost = false;
        self.recreated += 1;
        log::debug!("recording surface recreated ({} times)", self.recreated);
        Ok(())
    }
}
