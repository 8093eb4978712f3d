//! Kernel execution over grid buffers.

mod dispatch;

pub use dispatch::{dispatch, dispatch_pair};
