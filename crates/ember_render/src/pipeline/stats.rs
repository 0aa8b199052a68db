//! Pipeline statistics.

/// Lifetime counters of a frame pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames presented.
    pub frames_presented: u64,
    /// Update+render cycles skipped by a reset signal.
    pub cycles_skipped: u64,
    /// Resizes applied to the backend.
    pub resizes_applied: u32,
    /// Work items dropped by exhausted recorders, all frames.
    pub items_dropped: u64,
    /// Workers that panicked while recording, all frames.
    pub worker_panics: u32,
    /// Times `update` had to wait for a frame-in-flight fence.
    pub fence_waits: u64,
}
