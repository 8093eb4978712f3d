//! Grid-resident buffers and index codecs.

mod buffer;
pub mod morton;

pub use buffer::GridBuffer;
pub use morton::{from_morton, to_morton};
