//! Render surfaces: sinks for compiled draw streams.
//!
//! The render pipeline only sees the [`RenderSurface`] trait; which
//! implementation backs it is chosen once, when the pipeline is built.

mod gpu;
mod recording;
#[cfg(target_arch = "wasm32")]
mod web;

use std::sync::Arc;

use crate::error::RenderSurfaceError;
use crate::render::DrawStream;

pub use gpu::GpuSurface;
pub use recording::RecordingSurface;
#[cfg(target_arch = "wasm32")]
pub use web::WebSurface;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceKind {
    Native,
    Web,
    Headless,
}

/// Host-provided drawing target.
///
/// A frame is `submit` followed by `present`. Either may report
/// `ContextLost`, after which the pipeline calls `recreate` and submits the
/// full scene again.
pub trait RenderSurface {
    fn kind(&self) -> SurfaceKind;

    /// Drawable size in physical pixels.
    fn viewport(&self) -> (u32, u32);

    fn submit(&mut self, stream: &Arc<DrawStream>) -> Result<(), RenderSurfaceError>;

    fn present(&mut self) -> Result<(), RenderSurfaceError>;

    fn recreate(&mut self) -> Result<(), RenderSurfaceError>;
}

impl<S: RenderSurface + ?Sized> RenderSurface for Box<S> {
    fn kind(&self) -> SurfaceKind {
        (**self).kind()
    }

    fn viewport(&self) -> (u32, u32) {
        (**self).viewport()
    }

    fn submit(&mut self, stream: &Arc<DrawStream>) -> Result<(), RenderSurfaceError> {
        (**self).submit(stream)
    }

    fn present(&mut self) -> Result<(), RenderSurfaceError> {
        (**self).present()
    }

    fn recreate(&mut self) -> Result<(), RenderSurfaceError> {
        (**self).recreate()
    }
}
