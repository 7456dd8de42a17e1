use std::sync::Arc;

use crate::config::RenderConfig;
use crate::device::Gpu;
use crate::error::RenderSurfaceError;
use crate::render::gpu::{PathRenderer, RenderCtx, RenderTarget};
use crate::render::DrawStream;

use super::{RenderSurface, SurfaceKind};

/// Surface backed by a wgpu swapchain.
///
/// `submit` acquires a frame, records the stream and queues the commands;
/// `present` shows the frame acquired by the last `submit`.
pub struct GpuSurface<'w> {
    gpu: Gpu<'w>,
    renderer: PathRenderer,
    pending: Option<wgpu::SurfaceTexture>,
    kind: SurfaceKind,
}

impl<'w> GpuSurface<'w> {
    pub fn new(gpu: Gpu<'w>, config: &RenderConfig) -> Self {
        Self::with_kind(gpu, config, SurfaceKind::Native)
    }

    pub(crate) fn with_kind(gpu: Gpu<'w>, config: &RenderConfig, kind: SurfaceKind) -> Self {
        Self {
            gpu,
            renderer: PathRenderer::new(config.ramp_atlas_rows),
            pending: None,
            kind,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }
}

impl RenderSurface for GpuSurface<'_> {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn viewport(&self) -> (u32, u32) {
        self.gpu.size()
    }

    fn submit(&mut self, stream: &Arc<DrawStream>) -> Result<(), RenderSurfaceError> {
        let (w, h) = self.gpu.size();
        if w == 0 || h == 0 {
            return Err(RenderSurfaceError::Unavailable("surface has zero size".into()));
        }
        // An unpresented frame from a failed cycle is dropped here.
        self.pending = None;

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => return Err(self.gpu.handle_surface_error(err).into_surface_error()),
        };

        let ctx = RenderCtx::new(self.gpu.device(), self.gpu.queue(), self.gpu.surface_format(), (w, h));
        let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
        self.renderer.render(&ctx, &mut target, stream);

        self.gpu.queue().submit(std::iter::once(frame.encoder.finish()));
        self.pending = Some(frame.surface_texture);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        if let Some(texture) = self.pending.take() {
            texture.present();
        }
        Ok(())
    }

    fn recreate(&mut self) -> Result<(), RenderSurfaceError> {
        self.pending = None;
        self.gpu.reconfigure();
        self.renderer.reset();
        log::info!("GPU surface recreated");
        Ok(())
    }
}
