//! # Frame Pipeline
//!
//! Drives one engine instance through its lifecycle and its per-frame
//! sequence.
//!
//! ## Lifecycle
//!
//! ```text
//!   initialize ──> Running ──shutdown──> ShuttingDown ──> Terminated
//! ```
//!
//! ## Frame
//!
//! ```text
//!   update()                          render()
//!   ────────                          ────────
//!   reset raised? ──yes──> Skipped ─────────────────────────> no-op
//!        │no
//!        ▼
//!   Updating                          Recording   pool.dispatch (blocks)
//!   - wait for slot fence             Submitting  backend.execute, index order
//!   - apply pending resize            Presented   backend.present, publish profile
//! ```
//!
//! `render` without a preceding `update` runs the update itself. A reset
//! raised in the same tick as a resize request wins: the cycle is skipped and
//! the resize waits for the next cycle that is not.

mod frame;
mod stats;

pub use frame::{EngineState, Extent, FrameContext, FrameOutcome, FramePhase, TickState};
pub use stats::PipelineStats;

use std::sync::Arc;
use std::time::Instant;

use ember_core::OneShotFlag;

use crate::backend::{validate_extent, BackendDesc, RenderBackend};
use crate::command::WorkItem;
use crate::config::{validate_anisotropy, EngineConfig};
use crate::error::{RenderError, RenderResult};
use crate::pool::RenderThreadPool;
use crate::profiler::{ProfileReader, ProfilerSink, StageLabel};

/// One running engine instance.
pub struct FramePipeline<B: RenderBackend> {
    state: EngineState,
    phase: FramePhase,
    tick: TickState,
    reset: Arc<OneShotFlag>,
    pending_resize: Option<Extent>,
    extent: Extent,
    anisotropy: u8,
    slot: usize,
    /// Fence value each frame-in-flight slot was last presented with.
    slot_fences: Vec<u64>,
    frame_started: Instant,
    workload: Arc<[WorkItem]>,
    pool: RenderThreadPool,
    backend: B,
    profiler: ProfilerSink,
    stats: PipelineStats,
}

impl<B: RenderBackend> FramePipeline<B> {
    /// Validates `config`, creates the backend and spawns the render threads.
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration value, a backend creation
    /// failure or a thread spawn failure. Nothing stays alive on error.
    pub fn initialize(config: &EngineConfig) -> RenderResult<Self> {
        config.validate()?;

        let threads = config.effective_thread_count();
        let extent = Extent::new(config.width, config.height);

        let backend = B::create(&BackendDesc {
            extent,
            anisotropy: config.anisotropy,
            frames_in_flight: config.frames_in_flight,
        })?;
        let pool = RenderThreadPool::spawn(threads, config.recorder)?;

        tracing::info!(
            threads,
            extent = %extent,
            anisotropy = config.anisotropy,
            frames_in_flight = config.frames_in_flight,
            "render engine running"
        );

        Ok(Self {
            state: EngineState::Running,
            phase: FramePhase::Presented,
            tick: TickState::Idle,
            reset: Arc::new(OneShotFlag::new()),
            pending_resize: None,
            extent,
            anisotropy: config.anisotropy,
            slot: 0,
            slot_fences: vec![0; config.frames_in_flight],
            frame_started: Instant::now(),
            workload: Arc::from(Vec::<WorkItem>::new()),
            pool,
            backend,
            profiler: ProfilerSink::new(threads),
            stats: PipelineStats::default(),
        })
    }

    /// Engine-side bookkeeping for the next frame.
    ///
    /// Consumes a raised reset signal, in which case the whole cycle is
    /// skipped. Otherwise waits until the next frame-in-flight slot is free
    /// and applies a pending resize. Calling it again before `render` does
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotRunning`] after shutdown, or the backend's
    /// error if a resize fails.
    pub fn update(&mut self) -> RenderResult<TickState> {
        self.ensure_running()?;
        if self.tick != TickState::Idle {
            return Ok(self.tick);
        }

        if self.reset.take() {
            self.tick = TickState::Skipped;
            self.stats.cycles_skipped += 1;
            match self.pending_resize {
                Some(extent) => tracing::debug!(
                    extent = %extent,
                    "reset signal consumed, cycle skipped, resize deferred"
                ),
                None => tracing::debug!("reset signal consumed, cycle skipped"),
            }
            return Ok(TickState::Skipped);
        }

        self.phase = FramePhase::Updating;
        self.frame_started = Instant::now();
        let frame_index = self.stats.frames_presented;
        self.slot = slot_for(frame_index, self.slot_fences.len());

        let fence = self.slot_fences[self.slot];
        if fence > self.backend.completed_fence() {
            self.backend.wait_for_fence(fence);
            self.stats.fence_waits += 1;
        }

        if let Some(extent) = self.pending_resize {
            self.backend.wait_idle();
            self.backend.resize(extent)?;
            self.pending_resize = None;
            tracing::info!(from = %self.extent, to = %extent, "resize applied");
            self.extent = extent;
            self.stats.resizes_applied += 1;
        }

        self.profiler.begin_frame(frame_index);
        self.profiler
            .record_cpu(StageLabel::Named("Update"), self.frame_started.elapsed());

        self.tick = TickState::Updated;
        Ok(TickState::Updated)
    }

    /// Builds, submits and presents one frame. Blocks until every worker is
    /// done.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotRunning`] after shutdown, a lost worker, or
    /// a backend failure. The next cycle starts fresh either way.
    pub fn render(&mut self) -> RenderResult<FrameOutcome> {
        self.ensure_running()?;
        if self.tick == TickState::Idle {
            self.update()?;
        }

        let outcome = if self.tick == TickState::Skipped {
            Ok(FrameOutcome::Skipped)
        } else {
            self.build_frame()
        };

        self.tick = TickState::Idle;
        outcome
    }

    fn build_frame(&mut self) -> RenderResult<FrameOutcome> {
        let frame = self.frame_context();

        self.phase = FramePhase::Recording;
        let start = Instant::now();
        let report = self.pool.dispatch(frame, &self.workload)?;
        self.profiler.record_cpu(StageLabel::Named("Record"), start.elapsed());
        for (index, elapsed) in self.pool.worker_timings().iter().enumerate() {
            self.profiler.record_cpu(StageLabel::Worker(index), *elapsed);
        }
        self.profiler.add_record_stats(report.totals);
        self.stats.items_dropped += u64::from(report.totals.dropped);
        self.stats.worker_panics += report.panicked;

        self.phase = FramePhase::Submitting;
        let start = Instant::now();
        for list in self.pool.command_lists() {
            self.backend.execute(&frame, list)?;
        }
        self.profiler.record_cpu(StageLabel::Named("Submit"), start.elapsed());

        let start = Instant::now();
        let info = self.backend.present(&frame)?;
        self.slot_fences[frame.slot] = info.fence_value;
        self.phase = FramePhase::Presented;
        self.profiler.record_cpu(StageLabel::Named("Present"), start.elapsed());

        self.profiler
            .record_cpu(StageLabel::Named("Total"), self.frame_started.elapsed());
        self.profiler.record_gpu_samples(self.backend.gpu_timings());
        self.profiler.publish();
        self.stats.frames_presented += 1;

        tracing::trace!(
            frame = info.frame_index,
            fence = info.fence_value,
            draws = info.draw_count,
            "frame presented"
        );
        Ok(FrameOutcome::Presented(info))
    }

    /// Stops the render threads, waits for the backend and clears the
    /// profile. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if self.state == EngineState::Terminated {
            return;
        }

        self.state = EngineState::ShuttingDown;
        tracing::info!(frames = self.stats.frames_presented, "render engine shutting down");

        self.pool.shutdown();
        self.backend.wait_idle();
        self.profiler.clear();

        self.state = EngineState::Terminated;
        tracing::info!("render engine terminated");
    }

    /// Requests a new target resolution, applied at the start of the next
    /// cycle that is not skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidResolution`] for sizes the backend
    /// does not support.
    pub fn request_resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.ensure_running()?;
        let extent = Extent::new(width, height);
        validate_extent::<B>(extent)?;

        if extent == self.extent {
            self.pending_resize = None;
        } else {
            tracing::debug!(extent = %extent, "resize requested");
            self.pending_resize = Some(extent);
        }
        Ok(())
    }

    /// Changes the global anisotropic filtering level from the next frame on.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidAnisotropy`] outside `[1, 16]`.
    pub fn set_anisotropy(&mut self, level: u8) -> RenderResult<()> {
        self.ensure_running()?;
        let level = validate_anisotropy(i64::from(level))?;
        if level != self.anisotropy {
            tracing::debug!(from = self.anisotropy, to = level, "anisotropy changed");
            self.anisotropy = level;
            self.backend.set_anisotropy(level);
        }
        Ok(())
    }

    /// Replaces the workload recorded every frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NotRunning`] after shutdown.
    pub fn set_workload(&mut self, items: impl Into<Arc<[WorkItem]>>) -> RenderResult<()> {
        self.ensure_running()?;
        self.workload = items.into();
        tracing::debug!(items = self.workload.len(), "workload replaced");
        Ok(())
    }

    /// Handle the host raises to skip the next cycle.
    #[must_use]
    pub fn reset_handle(&self) -> Arc<OneShotFlag> {
        Arc::clone(&self.reset)
    }

    /// Read handle for the published profile.
    #[must_use]
    pub fn profile_reader(&self) -> ProfileReader {
        self.profiler.reader()
    }

    /// Number of render threads.
    #[inline]
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.pool.thread_count()
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// Phase of the current frame.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Where the current tick stands.
    #[inline]
    #[must_use]
    pub const fn tick(&self) -> TickState {
        self.tick
    }

    /// Current target resolution.
    #[inline]
    #[must_use]
    pub const fn extent(&self) -> Extent {
        self.extent
    }

    /// Current anisotropic filtering level.
    #[inline]
    #[must_use]
    pub const fn anisotropy(&self) -> u8 {
        self.anisotropy
    }

    /// Lifetime counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// The backend, for inspection.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    fn frame_context(&self) -> FrameContext {
        FrameContext {
            frame_index: self.stats.frames_presented,
            slot: self.slot,
            extent: self.extent,
            anisotropy: self.anisotropy,
        }
    }

    fn ensure_running(&self) -> RenderResult<()> {
        if self.state == EngineState::Running {
            Ok(())
        } else {
            Err(RenderError::NotRunning)
        }
    }
}

impl<B: RenderBackend> Drop for FramePipeline<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<B: RenderBackend> std::fmt::Debug for FramePipeline<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("tick", &self.tick)
            .field("extent", &self.extent)
            .field("anisotropy", &self.anisotropy)
            .field("threads", &self.pool.thread_count())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn slot_for(frame_index: u64, slots: usize) -> usize {
    (frame_index % slots as u64) as usize
}
