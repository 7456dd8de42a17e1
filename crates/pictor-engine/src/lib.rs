//! Pictor engine crate.
//!
//! Vector document engine: scene storage, paint model, spatial indexing and the
//! render pipeline that drives native and browser GPU surfaces as well as the
//! static export backends.

pub mod config;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod paint;
pub mod spatial;
pub mod document;
pub mod render;
pub mod surface;
pub mod export;
pub mod device;
pub mod time;

#[cfg(not(target_arch = "wasm32"))]
pub mod core;
#[cfg(not(target_arch = "wasm32"))]
pub mod window;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{EngineConfig, ImportSettings, RenderConfig};
pub use document::{Document, NodeId, NodeSpec, NodeUpdate, PaintTarget, SharedDocument};
pub use error::{EngineError, IndexConsistencyError, RenderSurfaceError, ValidationError};
pub use geometry::{Geometry, Transform};
pub use paint::{Color, GradientStop, Paint, PaintId, PaintKind, PaintType};
