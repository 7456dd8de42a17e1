//! Time subsystem.
//!
//! Frame timing utilities shared by the native runtime and the browser bridge:
//! - one `FrameClock` per window (or per render loop), ticked once per presented frame
//! - one `FrameBudget` per frame, consulted while compiling draw commands

mod budget;
mod frame_clock;

pub use budget::FrameBudget;
pub use frame_clock::{FrameClock, FrameTime};
