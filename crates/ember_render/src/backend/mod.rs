//! # Render Backend
//!
//! The pipeline never talks to a graphics API directly. It hands recorded
//! command lists to a [`RenderBackend`] in worker order and asks it to
//! present.
//!
//! ```text
//!   FramePipeline                         RenderBackend
//!   ─────────────                         ─────────────
//!   update():  wait_for_fence(slot) ───>  blocks until the slot is free
//!              resize(extent)       ───>  recreates size-dependent state
//!   render():  execute(list 0)      ───>
//!              execute(list 1)      ───>  lists run in submission order
//!              ...
//!              present()            ───>  signals fence N, returns PresentInfo
//! ```

mod headless;

pub use headless::HeadlessBackend;

use crate::command::CommandList;
use crate::error::RenderResult;
use crate::pipeline::{Extent, FrameContext};
use crate::profiler::StageSample;

/// Parameters a backend is created with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendDesc {
    /// Initial target resolution.
    pub extent: Extent,
    /// Initial anisotropic filtering level.
    pub anisotropy: u8,
    /// Number of frame-in-flight slots.
    pub frames_in_flight: usize,
}

/// What a backend reports after presenting a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentInfo {
    /// Frame that was presented.
    pub frame_index: u64,
    /// Fence value signalled when the frame's work completes.
    pub fence_value: u64,
    /// Commands executed for the frame.
    pub command_count: u64,
    /// Draw commands executed for the frame.
    pub draw_count: u64,
    /// Hash of the frame's command stream in execution order.
    pub fingerprint: u64,
}

/// A graphics backend the frame pipeline submits to.
///
/// Called from the host thread only.
pub trait RenderBackend: Send + Sized {
    /// Largest width or height the backend accepts.
    const MAX_EXTENT: u32 = 16_384;

    /// Creates the backend context.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::BackendCreation`] if the context cannot
    /// be created for `desc`.
    fn create(desc: &BackendDesc) -> RenderResult<Self>;

    /// Current target resolution.
    fn extent(&self) -> Extent;

    /// Recreates size-dependent resources. The backend is idle when called.
    ///
    /// # Errors
    ///
    /// Returns an error if the extent is not supported.
    fn resize(&mut self, extent: Extent) -> RenderResult<()>;

    /// Changes the global sampler state.
    fn set_anisotropy(&mut self, level: u8);

    /// Executes one worker's command list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Backend`] if execution fails.
    fn execute(&mut self, frame: &FrameContext, list: CommandList<'_>) -> RenderResult<()>;

    /// Presents the frame whose lists were executed since the last present.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RenderError::Backend`] if presentation fails.
    fn present(&mut self, frame: &FrameContext) -> RenderResult<PresentInfo>;

    /// Highest fence value known to be complete.
    fn completed_fence(&self) -> u64;

    /// Blocks until fence `value` completes.
    fn wait_for_fence(&mut self, value: u64);

    /// Blocks until all submitted work completes.
    fn wait_idle(&mut self);

    /// Per-stage execution times of the last presented frame.
    fn gpu_timings(&self) -> &[StageSample];
}

/// Checks `extent` against the limits of backend `B`.
///
/// # Errors
///
/// Returns [`crate::RenderError::InvalidResolution`] for an empty or
/// oversized extent.
pub fn validate_extent<B: RenderBackend>(extent: Extent) -> RenderResult<()> {
    let fits = |side: u32| (1..=B::MAX_EXTENT).contains(&side);
    if fits(extent.width) && fits(extent.height) {
        Ok(())
    } else {
        Err(crate::RenderError::InvalidResolution {
            width: i64::from(extent.width),
            height: i64::from(extent.height),
        })
    }
}
