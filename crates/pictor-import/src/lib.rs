//! Import adapter.
//!
//! Turns externally sourced design documents into a single batch of
//! document mutations. Malformed paints are normalized where possible and
//! dropped with a warning otherwise; a network, I/O or parse failure aborts
//! the whole import and leaves the document untouched.

mod convert;
mod error;
mod schema;
mod source;
mod task;

pub use convert::{convert, ImportBatch, ImportWarning};
pub use error::ImportError;
pub use schema::{SourceFile, SourceFill, SourceNode, SourceScene, SourceShape};
pub use source::{source_for, BytesSource, FileSource, HttpSource, ImportSource};
pub use task::{import_blocking, prepare, ImportHandle, ImportReport, Importer};
