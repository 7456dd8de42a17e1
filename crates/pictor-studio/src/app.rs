use kurbo::Rect;
use pictor_engine::core::{App, AppControl, FrameCtx};
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

/// Fraction of the window left empty around fitted content.
const FIT_MARGIN: f64 = 0.05;

/// Viewer: keeps the document content fitted to the window until the user
/// switches to 1:1 with `1`. `F` fits again, `Esc` quits.
pub struct StudioApp {
    fit: bool,
    fitted: Option<(u64, (u32, u32))>,
}

impl StudioApp {
    pub fn new() -> Self {
        Self { fit: true, fitted: None }
    }
}

impl Default for StudioApp {
    fn default() -> Self {
        Self::new()
    }
}

impl App for StudioApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        let WindowEvent::KeyboardInput { event, .. } = event else {
            return AppControl::Continue;
        };
        if event.state != ElementState::Pressed {
            return AppControl::Continue;
        }
        match event.logical_key.as_ref() {
            Key::Named(NamedKey::Escape) => return AppControl::Exit,
            Key::Character("f") => {
                self.fit = true;
                self.fitted = None;
            }
            Key::Character("1") => self.fit = false,
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        if let Some(report) = ctx.last_frame.filter(|r| r.degraded) {
            log::debug!(
                "frame {} degraded at {:.0} fps: {} nodes deferred",
                ctx.time.frame_index,
                ctx.time.fps,
                report.deferred
            );
        }

        if !self.fit {
            *ctx.region = None;
            return AppControl::Continue;
        }

        let size = ctx.window.physical_size();
        let revision = ctx.document.revision();
        if self.fitted == Some((revision, size)) {
            return AppControl::Continue;
        }
        if let Some(content) = ctx.document.snapshot().content_bounds() {
            ctx.show_region(fit_region(content, size, FIT_MARGIN));
        }
        self.fitted = Some((revision, size));
        AppControl::Continue
    }
}

/// Region with the window's aspect ratio that shows `content` centered, with
/// `margin` of the window left free on each side.
pub fn fit_region(content: Rect, (width, height): (u32, u32), margin: f64) -> Rect {
    let (w, h) = (f64::from(width.max(1)), f64::from(height.max(1)));
    let usable = (1.0 - 2.0 * margin).max(0.1);
    let cw = content.width().max(1e-6);
    let ch = content.height().max(1e-6);
    let zoom = (w * usable / cw).min(h * usable / ch);
    let (rw, rh) = (w / zoom, h / zoom);
    let c = content.center();
    Rect::new(c.x - rw / 2.0, c.y - rh / 2.0, c.x + rw / 2.0, c.y + rh / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_window_aspect_and_centers() {
        let r = fit_region(Rect::new(0.0, 0.0, 100.0, 50.0), (400, 400), 0.0);
        assert_eq!(r, Rect::new(0.0, -25.0, 100.0, 75.0));
    }

    #[test]
    fn margin_leaves_room() {
        let r = fit_region(Rect::new(0.0, 0.0, 90.0, 90.0), (100, 100), 0.05);
        assert!((r.width() - 100.0).abs() < 1e-9);
        assert!(r.contains(kurbo::Point::new(0.0, 0.0)));
    }
}
