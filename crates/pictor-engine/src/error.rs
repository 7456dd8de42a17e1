//! Error taxonomy shared by every engine subsystem.
//!
//! - [`ValidationError`]: a single malformed paint, geometry or transform. Callers
//!   recover locally by normalizing or rejecting that one entity.
//! - [`IndexConsistencyError`]: the spatial index disagrees with live node bounds.
//!   This is an engine bug and is treated as fatal.
//! - [`RenderSurfaceError`]: GPU context loss or an export target that cannot
//!   express the scene. Recovered by surface recreation or reported per export.

use thiserror::Error;

use crate::document::NodeId;
use crate::paint::PaintId;

/// A malformed paint, geometry or transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("gradient needs at least 2 stops, {found} left after normalization")]
    TooFewStops { found: usize },

    #[error("transform is not invertible (determinant {det})")]
    DegenerateTransform { det: f64 },

    #[error("non-finite value in {what}")]
    NonFinite { what: &'static str },

    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("paint {0} is solid and has no gradient stops or transform")]
    NotAGradient(PaintId),
}

/// The spatial index no longer mirrors the live node set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexConsistencyError {
    #[error("node {0} is already indexed")]
    DuplicateEntry(NodeId),

    #[error("node {0} is missing from the index")]
    MissingEntry(NodeId),

    #[error("node {id} indexed at {indexed:?} but its bounds are {actual:?}")]
    BoundsMismatch {
        id: NodeId,
        indexed: [f64; 4],
        actual: [f64; 4],
    },

    #[error("index holds {indexed} entries for {live} live nodes")]
    CountMismatch { indexed: usize, live: usize },
}

/// Failures of a render surface or an export target.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderSurfaceError {
    #[error("GPU context lost")]
    ContextLost,

    #[error("GPU out of memory")]
    OutOfMemory,

    #[error("surface frame acquisition timed out")]
    Timeout,

    #[error("surface unavailable: {0}")]
    Unavailable(String),

    #[error("node {node}: {reason}")]
    UnsupportedPaint { node: NodeId, reason: String },

    #[error("export region {width}x{height} is empty or too large")]
    InvalidExportSize { width: u32, height: u32 },

    #[error("export encoding failed: {0}")]
    Encode(String),
}

impl RenderSurfaceError {
    /// Returns true when recreating the surface is expected to recover.
    pub fn is_context_loss(&self) -> bool {
        matches!(self, RenderSurfaceError::ContextLost)
    }
}

/// Result of a Document mutation or query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    IndexConsistency(#[from] IndexConsistencyError),

    #[error("node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("paint {paint} not found on node {node}")]
    PaintNotFound { node: NodeId, paint: PaintId },

    #[error("paint index {index} out of range for a list of {len}")]
    PaintIndexOutOfRange { index: usize, len: usize },

    #[error("z position {z} out of range for {len} nodes")]
    ZOutOfRange { z: usize, len: usize },
}

impl EngineError {
    /// Returns true for errors that indicate a broken engine invariant.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::IndexConsistency(_))
    }
}
