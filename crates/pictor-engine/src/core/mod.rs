//! Contracts between the native runtime and the host application.
//!
//! The runtime owns windows and their render pipelines; the application edits
//! the shared document and steers the view once per frame through [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
