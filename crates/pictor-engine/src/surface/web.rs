use std::sync::Arc;

use anyhow::Result;
use web_sys::HtmlCanvasElement;

use crate::config::RenderConfig;
use crate::device::{Gpu, GpuInit};
use crate::error::RenderSurfaceError;
use crate::render::DrawStream;

use super::{GpuSurface, RenderSurface, SurfaceKind};

/// WebGL2 surface on a browser canvas.
///
/// Tracks the canvas backing-store size: when the page resizes the canvas,
/// the next `submit` reconfigures the swapchain.
pub struct WebSurface {
    canvas: HtmlCanvasElement,
    inner: GpuSurface<'static>,
}

impl WebSurface {
    pub async fn new(canvas: HtmlCanvasElement, config: &RenderConfig) -> Result<Self> {
        let size = (canvas.width().max(1), canvas.height().max(1));
        let gpu = Gpu::new(wgpu::SurfaceTarget::Canvas(canvas.clone()), size, GpuInit::default()).await?;
        Ok(Self {
            canvas,
            inner: GpuSurface::with_kind(gpu, config, SurfaceKind::Web),
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn sync_size(&mut self) {
        let size = (self.canvas.width(), self.canvas.height());
        if size != self.inner.viewport() {
            log::debug!("canvas resized to {}x{}", size.0, size.1);
            self.inner.resize(size.0, size.1);
        }
    }
}

impl RenderSurface for WebSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Web
    }

    fn viewport(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn submit(&mut self, stream: &Arc<DrawStream>) -> Result<(), RenderSurfaceError> {
        self.sync_size();
        self.inner.submit(stream)
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        self.inner.present()
    }

    fn recreate(&mut self) -> Result<(), RenderSurfaceError> {
        self.sync_size();
        self.inner.recreate()
    }
}
