//! # Control Surface
//!
//! The stable set of operations a host uses to drive and query the engine.
//!
//! ```text
//!   Host main thread                       Host UI / any thread
//!   ────────────────                       ────────────────────
//!   initialize(threads, w, h) → bool
//!   loop {
//!       update()                            cpu_profile() → String
//!       render()   (blocks)                 gpu_profile() → String
//!   }                                       thread_count() → i32
//!   shutdown()                              signal_reset()
//! ```
//!
//! Nothing fails across this boundary: every engine error is logged and
//! turned into `false`, `0`, an empty string or a silent no-op.
//!
//! ## Locking
//!
//! `update`, `render` and the configuration calls hold the engine lock.
//! Profile queries, `thread_count`, `state` and `signal_reset` only touch a
//! separate status block, so they never wait for a frame to finish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ember_core::OneShotFlag;
use ember_render::config::validate_anisotropy;
use ember_render::{
    EngineConfig, EngineState, FrameOutcome, FramePipeline, HeadlessBackend, ProfileReader,
    ProfileSnapshot, RenderBackend, RenderError, RenderResult, WorkItem, MAX_RENDER_THREADS,
    MIN_RENDER_THREADS,
};
use parking_lot::{const_mutex, const_rwlock, Mutex, RwLock};

/// The process-wide surface used by the C ABI and the demo.
static GLOBAL: ControlSurface<HeadlessBackend> = ControlSurface::new();

/// Clamps a host-provided thread count into the supported range.
///
/// Hosts that expose the count as a free-form setting call this before
/// [`ControlSurface::initialize`], which itself rejects out-of-range values.
///
/// ```rust
/// use ember::clamp_thread_request;
///
/// assert_eq!(clamp_thread_request(1), 2);
/// assert_eq!(clamp_thread_request(6), 6);
/// assert_eq!(clamp_thread_request(64), 16);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const fn clamp_thread_request(requested: i32) -> i32 {
    let min = MIN_RENDER_THREADS as i32;
    let max = MAX_RENDER_THREADS as i32;
    if requested < min {
        min
    } else if requested > max {
        max
    } else {
        requested
    }
}

/// What queries can see without taking the engine lock.
struct Status {
    state: EngineState,
    threads: usize,
    reader: Option<ProfileReader>,
    reset: Option<Arc<OneShotFlag>>,
}

impl Status {
    const fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            threads: 0,
            reader: None,
            reset: None,
        }
    }
}

/// Owner of at most one engine instance.
///
/// [`ControlSurface::global`] is the single instance per process. Separate
/// surfaces can be created for tests or embedding.
pub struct ControlSurface<B: RenderBackend = HeadlessBackend> {
    engine: Mutex<Option<FramePipeline<B>>>,
    status: RwLock<Status>,
    frames_presented: AtomicU64,
}

impl ControlSurface<HeadlessBackend> {
    /// The process-wide surface.
    #[inline]
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }
}

impl<B: RenderBackend> ControlSurface<B> {
    /// Creates a surface with no engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            engine: const_mutex(None),
            status: const_rwlock(Status::new()),
            frames_presented: AtomicU64::new(0),
        }
    }

    /// Creates the engine with `thread_count` workers rendering at
    /// `width` x `height`.
    ///
    /// Returns `false` if the arguments are out of range, an engine was
    /// already created on this surface, or any resource could not be created.
    /// A failed call leaves nothing behind and may be retried.
    pub fn initialize(&self, thread_count: i32, width: i32, height: i32) -> bool {
        let result = host_config(thread_count, width, height).and_then(|c| self.try_initialize(c));
        log_failure("initialize", result).is_some()
    }

    /// Same as [`ControlSurface::initialize`], from a full configuration.
    pub fn initialize_with(&self, config: EngineConfig) -> bool {
        log_failure("initialize", self.try_initialize(config)).is_some()
    }

    /// Creates the engine, reporting why it could not be created.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::AlreadyInitialized`] if this surface already
    /// created an engine (even one that has since been shut down), or the
    /// engine's own initialization error.
    pub fn try_initialize(&self, config: EngineConfig) -> RenderResult<()> {
        let mut engine = self.engine.lock();
        if self.status.read().state != EngineState::Uninitialized {
            return Err(RenderError::AlreadyInitialized);
        }

        let pipeline = FramePipeline::<B>::initialize(&config)?;
        {
            let mut status = self.status.write();
            status.state = EngineState::Running;
            status.threads = pipeline.thread_count();
            status.reader = Some(pipeline.profile_reader());
            status.reset = Some(pipeline.reset_handle());
        }
        self.frames_presented.store(0, Ordering::Release);
        *engine = Some(pipeline);
        Ok(())
    }

    /// Stops the workers and releases the engine. Safe to call at any time,
    /// any number of times.
    pub fn shutdown(&self) {
        let mut engine = self.engine.lock();
        let Some(mut pipeline) = engine.take() else {
            return;
        };

        self.status.write().state = EngineState::ShuttingDown;
        pipeline.shutdown();
        drop(pipeline);

        let mut status = self.status.write();
        status.state = EngineState::Terminated;
        status.threads = 0;
        status.reader = None;
        status.reset = None;
    }

    /// Engine bookkeeping for the next frame. No-op without an engine.
    pub fn update(&self) {
        if let Some(engine) = self.engine.lock().as_mut() {
            log_failure("update", engine.update());
        }
    }

    /// Renders one frame, blocking until it is presented. No-op without an
    /// engine.
    pub fn render(&self) {
        if let Some(engine) = self.engine.lock().as_mut() {
            if let Some(FrameOutcome::Presented(_)) = log_failure("render", engine.render()) {
                self.frames_presented
                    .store(engine.stats().frames_presented, Ordering::Release);
            }
        }
    }

    /// Number of render threads, `0` without an engine.
    #[must_use]
    pub fn thread_count(&self) -> i32 {
        i32::try_from(self.status.read().threads).unwrap_or(i32::MAX)
    }

    /// CPU breakdown of the last presented frame, empty if there is none.
    #[must_use]
    pub fn cpu_profile(&self) -> String {
        self.reader()
            .as_ref()
            .map(ProfileReader::cpu_profile)
            .unwrap_or_default()
    }

    /// GPU breakdown of the last presented frame, empty if there is none.
    #[must_use]
    pub fn gpu_profile(&self) -> String {
        self.reader()
            .as_ref()
            .map(ProfileReader::gpu_profile)
            .unwrap_or_default()
    }

    /// Both breakdowns of the last presented frame, taken from one snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ProfileSnapshot> {
        self.reader()
            .as_ref()
            .map_or_else(|| Arc::new(ProfileSnapshot::default()), ProfileReader::snapshot)
    }

    /// Skips the next update+render cycle. Can be called from any thread.
    pub fn signal_reset(&self) {
        if let Some(reset) = self.status.read().reset.as_ref() {
            reset.raise();
        }
    }

    /// Changes the global anisotropic filtering level.
    ///
    /// Returns `false` outside `[1, 16]` or without an engine.
    pub fn set_anisotropy(&self, level: i32) -> bool {
        let result = validate_anisotropy(i64::from(level))
            .and_then(|level| self.with_engine(|engine| engine.set_anisotropy(level)));
        log_failure("set_anisotropy", result).is_some()
    }

    /// Requests a new resolution, applied at the start of the next frame.
    ///
    /// Returns `false` for unsupported sizes or without an engine.
    pub fn resize(&self, width: i32, height: i32) -> bool {
        let result = host_extent(width, height)
            .and_then(|(w, h)| self.with_engine(|engine| engine.request_resize(w, h)));
        log_failure("resize", result).is_some()
    }

    /// Replaces the workload recorded each frame. Returns `false` without an
    /// engine.
    pub fn set_workload(&self, items: Vec<WorkItem>) -> bool {
        log_failure("set_workload", self.with_engine(|engine| engine.set_workload(items))).is_some()
    }

    /// Frames presented by the current engine.
    #[must_use]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented.load(Ordering::Acquire)
    }

    /// Lifecycle state of this surface's engine.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.status.read().state
    }

    fn reader(&self) -> Option<ProfileReader> {
        self.status.read().reader.clone()
    }

    fn with_engine<R>(
        &self,
        f: impl FnOnce(&mut FramePipeline<B>) -> RenderResult<R>,
    ) -> RenderResult<R> {
        self.engine
            .lock()
            .as_mut()
            .map_or(Err(RenderError::NotRunning), f)
    }
}

impl<B: RenderBackend> Default for ControlSurface<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: RenderBackend> std::fmt::Debug for ControlSurface<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSurface")
            .field("state", &self.state())
            .field("threads", &self.thread_count())
            .field("frames_presented", &self.frames_presented())
            .finish()
    }
}

fn host_config(thread_count: i32, width: i32, height: i32) -> RenderResult<EngineConfig> {
    let threads = usize::try_from(thread_count).map_err(|_| RenderError::InvalidThreadCount {
        requested: i64::from(thread_count),
        min: MIN_RENDER_THREADS,
        max: MAX_RENDER_THREADS,
    })?;
    let (width, height) = host_extent(width, height)?;
    Ok(EngineConfig::new(threads, width, height))
}

fn host_extent(width: i32, height: i32) -> RenderResult<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(RenderError::InvalidResolution {
            width: i64::from(width),
            height: i64::from(height),
        }),
    }
}

fn log_failure<T>(operation: &'static str, result: RenderResult<T>) -> Option<T> {
    result
        .map_err(|error| tracing::error!(operation, %error, "engine call failed"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_thread_request() {
        assert_eq!(clamp_thread_request(i32::MIN), 2);
        assert_eq!(clamp_thread_request(0), 2);
        assert_eq!(clamp_thread_request(2), 2);
        assert_eq!(clamp_thread_request(16), 16);
        assert_eq!(clamp_thread_request(17), 16);
    }

    #[test]
    fn test_host_config_rejects_negative_values() {
        assert!(matches!(
            host_config(-1, 800, 600),
            Err(RenderError::InvalidThreadCount { requested: -1, .. })
        ));
        assert_eq!(
            host_config(4, -800, 600),
            Err(RenderError::InvalidResolution { width: -800, height: 600 })
        );
    }

    #[test]
    fn test_queries_without_engine() {
        let surface = ControlSurface::<HeadlessBackend>::new();
        surface.update();
        surface.render();
        surface.signal_reset();
        surface.shutdown();

        assert_eq!(surface.state(), EngineState::Uninitialized);
        assert_eq!(surface.thread_count(), 0);
        assert!(surface.cpu_profile().is_empty());
        assert!(surface.snapshot().is_empty());
        assert!(!surface.set_anisotropy(4));
        assert!(!surface.resize(640, 480));
    }

    #[test]
    fn test_failed_initialize_can_be_retried() {
        let surface = ControlSurface::<HeadlessBackend>::new();
        assert!(!surface.initialize(4, 0, 600));
        assert_eq!(surface.state(), EngineState::Uninitialized);
        assert!(surface.initialize(4, 800, 600));
        assert_eq!(surface.state(), EngineState::Running);
    }

    #[test]
    fn test_reinitialize_after_shutdown_rejected() {
        let surface = ControlSurface::<HeadlessBackend>::new();
        assert!(surface.initialize(2, 64, 64));
        surface.shutdown();
        assert_eq!(
            surface.try_initialize(EngineConfig::new(2, 64, 64)),
            Err(RenderError::AlreadyInitialized)
        );
    }
}
