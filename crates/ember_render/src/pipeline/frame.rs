//! Frame data structures.
//!
//! A frame exists for one update+render pair. Workers only ever see the
//! immutable [`FrameContext`].

use std::fmt;

use crate::backend::PresentInfo;

/// Target resolution in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Creates an extent.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Read-only per-frame state shared with every worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameContext {
    /// Index of the frame being built (equals frames presented so far).
    pub frame_index: u64,
    /// Frame-in-flight slot.
    pub slot: usize,
    /// Target resolution.
    pub extent: Extent,
    /// Global anisotropic filtering level.
    pub anisotropy: u8,
}

/// Phase of the frame currently owned by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FramePhase {
    /// Engine-side bookkeeping (fences, resize).
    Updating,
    /// Workers recording command lists.
    Recording,
    /// Lists handed to the backend in worker order.
    Submitting,
    /// Frame presented; the next update starts a new frame.
    Presented,
}

/// Lifecycle of an engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// No instance has been created.
    Uninitialized,
    /// Workers are parked awaiting frames.
    Running,
    /// Workers are draining.
    ShuttingDown,
    /// All resources released.
    Terminated,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::ShuttingDown => "shutting down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Where the current host tick stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickState {
    /// No update has run since the last render.
    Idle,
    /// Update ran; render will build a frame.
    Updated,
    /// A reset was consumed; this tick's render is a no-op.
    Skipped,
}

/// Result of a render call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was built and presented.
    Presented(PresentInfo),
    /// The cycle was skipped because of a reset signal.
    Skipped,
}

impl FrameOutcome {
    /// Returns true if a frame was presented.
    #[must_use]
    pub const fn is_presented(&self) -> bool {
        matches!(self, Self::Presented(_))
    }
}
