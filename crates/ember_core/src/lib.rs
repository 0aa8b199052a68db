//! # EMBER Core
//!
//! Primitives shared by the render workers, the frame pipeline and the host
//! boundary:
//! - Copy-on-publish snapshots that readers on any thread can load without
//!   ever observing a half-written value
//! - Single-shot flags for signals raised by the host and consumed once
//! - Bounded, reusable buffers for per-frame recording
//!
//! ## Architecture Rules
//!
//! 1. **No allocation in steady state** - buffers are cleared, not dropped
//! 2. **Publish, don't mutate** - shared state is replaced as a whole
//! 3. **Exhaustion is a value** - running out of space returns an error, never panics
//!
//! ## Example
//!
//! ```rust
//! use ember_core::SnapshotCell;
//!
//! let cell = SnapshotCell::new(String::new());
//! cell.publish(String::from("frame 1"));
//! assert_eq!(cell.load().as_str(), "frame 1");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod sync;

pub use memory::{BoundedBuffer, BufferError, BufferStats};
pub use sync::{OneShotFlag, SnapshotCell};
