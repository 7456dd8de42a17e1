//! Scene graph: node storage, z-order, paint lists and the mutation API.

mod dirty;
#[allow(clippy::module_inception)]
mod document;
mod id;
mod mutation;
mod node;
mod shared;
mod snapshot;

pub use dirty::DirtySet;
pub use document::Document;
pub use id::NodeId;
pub use mutation::{BatchReport, Mutation};
pub use node::{Node, NodeSpec, NodeUpdate, PaintTarget};
pub use shared::{SharedDocument, WriteTurn};
pub use snapshot::{DocumentSnapshot, FrameSnapshot, NodeView};
