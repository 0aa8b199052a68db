//! # EMBER
//!
//! Host boundary of the EMBER render engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                               HOST                                  │
//! │        initialize · update · render · shutdown · profile queries    │
//! └───────────────────────────────┬─────────────────────────────────────┘
//!                                 │  ControlSurface (bool / i32 / String)
//! ┌───────────────────────────────▼─────────────────────────────────────┐
//! │  ember_render                                                        │
//! │  FramePipeline ──> RenderThreadPool ──> CommandRecorder × N          │
//! │        │                                                            │
//! │        └──> RenderBackend ──> ProfilerSink ──> ProfileSnapshot       │
//! └───────────────────────────────┬─────────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼─────────────────────────────────────┐
//! │  ember_core: SnapshotCell · OneShotFlag · BoundedBuffer              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `control`: the host-facing [`ControlSurface`]
//! - `ffi`: C ABI entry points (feature `ffi`)
//! - `logging`: `tracing` subscriber setup
//!
//! ## Usage
//!
//! ```rust
//! use ember::ControlSurface;
//! use ember::render::synthetic_workload;
//!
//! let surface: ControlSurface = ControlSurface::new();
//! assert!(surface.initialize(4, 1920, 1080));
//! surface.set_workload(synthetic_workload(1_000, 7));
//!
//! for _ in 0..3 {
//!     surface.update();
//!     surface.render();
//! }
//!
//! assert_eq!(surface.thread_count(), 4);
//! assert!(surface.cpu_profile().starts_with("Frame 2"));
//! surface.shutdown();
//! assert!(surface.cpu_profile().is_empty());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod control;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod logging;

// Re-export the layers
pub use ember_core as core;
pub use ember_render as render;

pub use control::{clamp_thread_request, ControlSurface};
pub use ember_render::{EngineConfig, EngineState, ProfileSnapshot};
pub use logging::init_logging;
