//! # Memory Management
//!
//! Reusable storage for per-frame data.
//!
//! ## Design Philosophy
//!
//! Buffers are sized once at startup and cleared every frame:
//! - Growth happens only while the working set is still warming up
//! - A hard limit bounds memory per buffer
//! - Hitting the limit is reported, not fatal

mod bounded_buffer;

pub use bounded_buffer::{BoundedBuffer, BufferError, BufferStats};
