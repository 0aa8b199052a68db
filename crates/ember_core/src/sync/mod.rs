//! # Synchronization Primitives
//!
//! ## The Problem
//!
//! ```text
//! Host thread:    render() ──> publish profile for frame N
//! UI thread:      cpu_profile() / gpu_profile()
//!
//! In-place mutation: reader sees half of frame N-1, half of frame N
//! Big lock:          reader stalls for the whole render
//! ```
//!
//! ## The Solution: Copy-on-Publish
//!
//! ```text
//! Writer builds snapshot N in a private buffer
//! SWAP (pointer exchange under a short write lock)
//! Readers clone the Arc of whichever snapshot is current
//! ```
//!
//! A reader holds either the old complete value or the new complete value.

mod one_shot;
mod snapshot;

pub use one_shot::OneShotFlag;
pub use snapshot::SnapshotCell;
