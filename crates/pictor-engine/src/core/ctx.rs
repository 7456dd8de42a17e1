use kurbo::Rect;
use winit::window::{Window, WindowId};

use crate::document::SharedDocument;
use crate::render::FrameReport;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Drawable size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }
}

/// Per-frame context passed to `core::App::on_frame`.
pub struct FrameCtx<'a> {
    pub window: WindowCtx<'a>,
    pub document: &'a SharedDocument,
    /// Document region shown in the window; `None` shows document units 1:1.
    pub region: &'a mut Option<Rect>,
    pub time: FrameTime,
    /// What the previous frame of this window did.
    pub last_frame: Option<FrameReport>,
    pub runtime: &'a mut RuntimeCtx,
}

impl FrameCtx<'_> {
    /// Shows `region` of the document, stretched over the whole window.
    pub fn show_region(&mut self, region: Rect) {
        *self.region = Some(region);
    }

    /// Shows the document at `zoom` with `origin` in the top-left corner.
    pub fn set_camera(&mut self, origin: kurbo::Point, zoom: f64) {
        let (w, h) = self.window.physical_size();
        let zoom = zoom.clamp(0.01, 256.0);
        *self.region = Some(Rect::new(
            origin.x,
            origin.y,
            origin.x + f64::from(w) / zoom,
            origin.y + f64::from(h) / zoom,
        ));
    }
}
