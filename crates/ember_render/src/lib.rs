//! # EMBER Render Engine
//!
//! Multi-threaded frame engine behind the host control surface:
//! - A fixed pool of render threads records one frame's commands in parallel
//! - Recorded lists are submitted in worker order, so output never depends on
//!   thread scheduling
//! - Per-stage CPU and GPU timings are published once per frame as a single
//!   snapshot any thread can read
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       FRAME PIPELINE                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  update: reset? → fence wait → resize                       │
//! │       ↓                                                     │
//! │  RenderThreadPool ─┬─ CommandRecorder 0                     │
//! │  (partition, join) ├─ CommandRecorder 1                     │
//! │                    └─ CommandRecorder N-1                   │
//! │       ↓                                                     │
//! │  RenderBackend: execute lists 0..N → present → fence        │
//! │       ↓                                                     │
//! │  ProfilerSink → ProfileSnapshot (pointer swap)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use ember_render::{EngineConfig, FramePipeline, HeadlessBackend, synthetic_workload};
//!
//! let config = EngineConfig::new(2, 320, 240);
//! let mut engine = FramePipeline::<HeadlessBackend>::initialize(&config).unwrap();
//! engine.set_workload(synthetic_workload(100, 1)).unwrap();
//!
//! engine.update().unwrap();
//! assert!(engine.render().unwrap().is_presented());
//! assert!(engine.profile_reader().cpu_profile().starts_with("Frame 0"));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod profiler;
pub mod recorder;
pub mod workload;

pub use backend::{BackendDesc, HeadlessBackend, PresentInfo, RenderBackend};
pub use command::{CommandList, RenderCommand, RenderQueue, WorkItem};
pub use config::{
    EngineConfig, RecorderConfig, MAX_ANISOTROPY, MAX_FRAMES_IN_FLIGHT, MAX_RECORDER_COMMANDS,
    MAX_RENDER_THREADS, MIN_ANISOTROPY, MIN_RENDER_THREADS,
};
pub use error::{RenderError, RenderResult};
pub use pipeline::{
    EngineState, Extent, FrameContext, FrameOutcome, FramePhase, FramePipeline, PipelineStats,
    TickState,
};
pub use pool::{DispatchReport, RenderThreadPool};
pub use profiler::{ProfileReader, ProfileSnapshot, ProfilerSink, StageLabel, StageSample};
pub use recorder::{CommandRecorder, RecordStats};
pub use workload::{partition_ranges, synthetic_workload};
