//! Geometry & transform math.
//!
//! Points and bounding boxes are `kurbo` types. Bounding boxes use
//! closed-interval semantics throughout the engine (see [`bounds`]).

pub mod bounds;
mod shape;
mod stroke;
mod transform;

pub use kurbo::{BezPath, Point, Rect};
pub use shape::{CornerRadii, Geometry};
pub use stroke::{FillRule, StrokeCap, StrokeJoin, StrokeStyle};
pub use transform::Transform;
