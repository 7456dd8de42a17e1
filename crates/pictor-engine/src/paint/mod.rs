//! Paint model edited by the UI and consumed by the render pipeline.
//!
//! Scope:
//! - straight-alpha color storage
//! - solid, linear and radial paints with stable identities
//! - stop normalization and lossy-but-principled variant conversion

mod color;
mod convert;
mod gradient;
#[allow(clippy::module_inception)]
mod paint;

pub use color::Color;
pub use convert::{convert, derived_second_color};
pub use gradient::{normalize_stops, sample_stops, stops_are_normalized, Gradient, GradientStop};
pub use paint::{Paint, PaintId, PaintKind, PaintType};

pub(crate) use paint::hash_stops;
