//! Key buffers for sensitive cryptographic data.

mod buffer;

pub use buffer::{BufferAllocator, KeyBuffer, KeyRole, SystemAllocator};
