//! GPU device + surface management.
//!
//! Creates the wgpu instance, adapter, device and queue, configures the
//! surface (swapchain) for a window or canvas, and hands out frames.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
