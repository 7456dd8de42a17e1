//! Spatial index over node bounding boxes.
//!
//! Answers "which nodes intersect region R" and "which nodes lie under point P"
//! in sub-linear time. The index stores only `NodeId -> bbox`; node ownership
//! stays with the Document.

mod index;

pub use index::{IndexEntry, IndexHit, SpatialIndex};
