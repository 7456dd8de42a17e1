//! Rendering: from document frames to backend-agnostic draw streams.
//!
//! The [`RenderPipeline`] pulls a frame from the shared document, compiles
//! dirty nodes into [`DrawItem`]s through the [`PaintCompiler`] and hands the
//! resulting [`DrawStream`] to a surface. The `gpu` module turns streams into
//! wgpu commands; the export backends consume the same streams.
//!
//! Convention:
//! - streams are in device pixels (top-left origin, +Y down).
//! - colors are sRGB bytes; GPU blending is premultiplied alpha.

mod compile;
mod flatten;
mod pipeline;
mod ramp;
mod state;
mod stream;

pub mod gpu;

pub use compile::{CompileStats, CompiledPaint, PaintCompiler};
pub use flatten::flatten;
pub use pipeline::{FrameReport, RenderPipeline};
pub use ramp::{GradientRamp, RampKey, RAMP_WIDTH};
pub use state::FrameState;
pub use stream::{DrawItem, DrawPass, DrawStream, FlatPath, GradientShading, ResolvedPaint, Shading, Viewport};
