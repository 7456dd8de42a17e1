//! wgpu backend for draw streams.
//!
//! Paths are drawn stencil-then-cover: a triangle fan per contour writes
//! winding counts into the stencil buffer, then a bounding quad shades every
//! pixel with a non-zero count and resets it.

mod common;
mod ctx;
mod path;

pub use ctx::{RenderCtx, RenderTarget};
pub use path::PathRenderer;
