//! Native window + runtime loop.
//!
//! Owns the `winit` EventLoop and the windows, each with its own render
//! pipeline over a GPU surface.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
