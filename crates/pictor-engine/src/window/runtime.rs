use anyhow::{Context, Result};
use kurbo::Rect;
use ouroboros::self_referencing;
use std::collections::HashMap;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::config::RenderConfig;
use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::document::SharedDocument;
use crate::error::RenderSurfaceError;
use crate::render::{FrameReport, RenderPipeline};
use crate::surface::GpuSurface;
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "pictor".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn create_window(&mut self, config: RuntimeConfig) {
        self.commands.push(Command::CreateWindow(config));
    }

    pub fn close_window(&mut self, id: WindowId) {
        self.commands.push(Command::CloseWindow(id));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    CreateWindow(RuntimeConfig),
    CloseWindow(WindowId),
    Exit,
}

/// Entry point for the native runtime.
///
/// Every window renders the same shared document through its own pipeline.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(
        initial: RuntimeConfig,
        document: SharedDocument,
        render: RenderConfig,
        gpu_init: GpuInit,
        app: A,
    ) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState {
            initial,
            document,
            render,
            gpu_init,
            app,
            windows: HashMap::new(),
            exit_requested: false,
        };

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    region: Option<Rect>,
    last_frame: Option<FrameReport>,

    window: Window,

    #[borrows(window)]
    #[covariant]
    pipeline: RenderPipeline<GpuSurface<'this>>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    initial: RuntimeConfig,
    document: SharedDocument,
    render: RenderConfig,
    gpu_init: GpuInit,
    app: A,

    windows: HashMap<WindowId, WindowEntry>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop, config: RuntimeConfig) -> Result<WindowId> {
        let attrs = Window::default_attributes()
            .with_title(config.title)
            .with_inner_size(config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let id = window.id();
        let gpu_init = self.gpu_init.clone();
        let render = self.render.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            region: None,
            last_frame: None,
            window,
            pipeline_builder: |w| -> Result<_> {
                let size = w.inner_size();
                let gpu = pollster::block_on(Gpu::new(w, (size.width.max(1), size.height.max(1)), gpu_init))
                    .context("GPU initialization failed for window")?;
                Ok(RenderPipeline::new(GpuSurface::new(gpu, &render), render))
            },
        }
        .try_build()?;

        self.windows.insert(id, entry);
        log::info!("window {id:?} created");
        Ok(id)
    }

    fn destroy_window_entry(&mut self, id: WindowId) {
        self.windows.remove(&id);
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, mut ctx: RuntimeCtx) {
        for cmd in ctx.commands.drain(..) {
            match cmd {
                Command::CreateWindow(cfg) => {
                    if let Err(e) = self.create_window_entry(event_loop, cfg) {
                        log::error!("failed to create window: {e:#}");
                        self.request_exit();
                    }
                }
                Command::CloseWindow(id) => self.destroy_window_entry(id),
                Command::Exit => self.request_exit(),
            }
        }

        if self.windows.is_empty() {
            self.request_exit();
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }

    /// Lets the app run, then renders one frame of the window.
    fn redraw(&mut self, window_id: WindowId) -> RuntimeCtx {
        let mut runtime_ctx = RuntimeCtx::default();
        let (app, windows, document) = (&mut self.app, &mut self.windows, &self.document);
        let Some(entry) = windows.get_mut(&window_id) else {
            return runtime_ctx;
        };

        entry.with_mut(|fields| {
            let time = fields.clock.tick();
            let control = {
                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        id: window_id,
                        window: fields.window,
                    },
                    document,
                    region: fields.region,
                    time,
                    last_frame: *fields.last_frame,
                    runtime: &mut runtime_ctx,
                };
                app.on_frame(&mut ctx)
            };
            if control == AppControl::Exit {
                runtime_ctx.exit();
                return;
            }

            fields.pipeline.set_region(*fields.region);
            fields.window.pre_present_notify();
            match fields.pipeline.frame(document) {
                Ok(report) => *fields.last_frame = Some(report),
                Err(RenderSurfaceError::OutOfMemory) => {
                    log::error!("GPU out of memory; closing window {window_id:?}");
                    runtime_ctx.close_window(window_id);
                }
                Err(err) if err.is_context_loss() => {
                    log::warn!("window {window_id:?}: {err}; redrawing");
                    fields.window.request_redraw();
                }
                Err(err) => log::debug!("window {window_id:?}: frame skipped: {err}"),
            }
        });
        runtime_ctx
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !self.windows.is_empty() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop, self.initial.clone()) {
            log::error!("failed to create initial window: {e:#}");
            self.request_exit();
            event_loop.exit();
            return;
        }

        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Unchanged frames resubmit the cached stream, so redrawing continuously is cheap.
        for entry in self.windows.values() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit();
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry(window_id);
                if self.windows.is_empty() {
                    self.request_exit();
                    event_loop.exit();
                }
            }

            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.windows.get_mut(&window_id) {
                    let size = entry.with_window(|w| w.inner_size());
                    entry.with_pipeline_mut(|p| p.surface_mut().resize(size.width, size.height));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::RedrawRequested => {
                let runtime_ctx = self.redraw(window_id);
                self.apply_commands(event_loop, runtime_ctx);
            }

            _ => {}
        }

        if self.exit_requested {
            event_loop.exit();
        }
    }
}
